use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use et_manifest_core::assemble::ReleaseInfo;
use et_manifest_core::build::{build, BuildOptions};
use et_manifest_core::error::CatalogError;
use et_manifest_core::manifest::DISTRIBUTION;
use et_manifest_core::path_safety::PathPolicy;
use et_manifest_core::verify::{verify_with_policy, Problem};

#[derive(Parser)]
#[command(name = "et-manifest", version, about = "Build and check EmComm-Tools update manifests")]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG wins when set
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Catalog a release tree and write its manifest
    Build {
        #[arg(long)] source: PathBuf,
        #[arg(long)] output: PathBuf,
        #[arg(long = "release-version", default_value = "0.0.0")] release_version: String,
        #[arg(long, default_value = "stable")] channel: String,
        #[arg(long, default_value = "")] base_url: String,
        #[arg(long, default_value = DISTRIBUTION)] distribution: String,
        /// YYYY-MM-DD; defaults to today
        #[arg(long)] release_date: Option<NaiveDate>,
        /// Extra glob to skip (repeatable), matched against the relative path
        #[arg(long)] exclude: Vec<String>,
        #[arg(long, default_value_t = false)] no_default_excludes: bool,
        #[arg(long, default_value_t = false)] follow_symlinks: bool,
    },
    /// Check a tree against an existing manifest
    Verify {
        #[arg(long)] manifest: PathBuf,
        #[arg(long)] source: PathBuf,
        #[arg(long, default_value_t = false)] follow_symlinks: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli.cmd) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            match e.downcast_ref::<CatalogError>() {
                Some(ce) if ce.is_configuration() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cmd: Cmd) -> Result<ExitCode> {
    match cmd {
        Cmd::Build {
            source,
            output,
            release_version,
            channel,
            base_url,
            distribution,
            release_date,
            exclude,
            no_default_excludes,
            follow_symlinks,
        } => {
            let opts = BuildOptions {
                release: ReleaseInfo { version: release_version, channel, base_url, distribution },
                release_date,
                excludes: exclude,
                default_excludes: !no_default_excludes,
                follow_symlinks,
                ..BuildOptions::new(source, output)
            };
            build_cmd(&opts)
        }
        Cmd::Verify { manifest, source, follow_symlinks } => verify_cmd(&manifest, &source, follow_symlinks),
    }
}

fn build_cmd(opts: &BuildOptions) -> Result<ExitCode> {
    debug!(
        source = %opts.source.display(),
        output = %opts.output.display(),
        version = %opts.release.version,
        channel = %opts.release.channel,
        excludes = ?opts.excludes,
        "starting build"
    );
    let rep = build(opts)?;
    for s in &rep.skipped {
        eprintln!("skipped {}: {}", s.path, s.reason);
    }
    if rep.file_count() == 0 {
        println!("No files found under {}", opts.source.display());
    }
    println!(
        "Cataloged {} file(s) ({} skipped, {} excluded) -> {}",
        rep.file_count(),
        rep.skipped.len(),
        rep.excluded,
        rep.output.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn verify_cmd(manifest: &Path, source: &Path, follow_symlinks: bool) -> Result<ExitCode> {
    debug!(manifest = %manifest.display(), source = %source.display(), follow_symlinks, "starting verify");
    let policy = PathPolicy { follow_symlinks };
    let rep = verify_with_policy(manifest, source, policy)
        .with_context(|| format!("verify {} against {}", manifest.display(), source.display()))?;
    for (path, problem) in &rep.problems {
        match problem {
            Problem::Missing => eprintln!("{path}: missing"),
            Problem::SizeMismatch { expected, actual } => eprintln!("{path}: size {actual}, expected {expected}"),
            Problem::ChecksumMismatch { .. } => eprintln!("{path}: sha256 mismatch"),
            Problem::Unsafe(reason) => eprintln!("{path}: rejected ({reason})"),
        }
    }
    eprintln!("Files ok={}, bad={}", rep.files_ok, rep.problems.len());
    if rep.is_ok() {
        println!("OK");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("BAD");
        Ok(ExitCode::FAILURE)
    }
}
