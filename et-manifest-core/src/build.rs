use anyhow::Result;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::assemble::{assemble, today, ReleaseInfo};
use crate::catalog::{rel_path, CatalogConfig, Cataloger, SkippedFile};
use crate::exclude::ExcludeSet;
use crate::manifest::Manifest;
use crate::write::write_manifest;

#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    pub release: ReleaseInfo,
    /// `None` means today's local date.
    pub release_date: Option<NaiveDate>,
    pub excludes: Vec<String>,
    pub default_excludes: bool,
    pub follow_symlinks: bool,
}

impl BuildOptions {
    pub fn new(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            release: ReleaseInfo::default(),
            release_date: None,
            excludes: Vec::new(),
            default_excludes: true,
            follow_symlinks: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BuildReport {
    pub manifest: Manifest,
    pub output: PathBuf,
    pub excluded: usize,
    pub skipped: Vec<SkippedFile>,
}

impl BuildReport {
    pub fn file_count(&self) -> usize {
        self.manifest.files.len()
    }
}

/// Catalog `opts.source`, wrap the records, and write the manifest to
/// `opts.output`. Either a complete manifest is written or the destination is
/// left as it was.
pub fn build(opts: &BuildOptions) -> Result<BuildReport> {
    let mut exclude = ExcludeSet::with_extra(opts.default_excludes, opts.excludes.as_slice())?;
    if let Some(rel) = output_within(&opts.source, &opts.output) {
        exclude = exclude.with_literal(&rel)?;
    }

    let cataloger = Cataloger::new(CatalogConfig { exclude, follow_symlinks: opts.follow_symlinks });
    let catalog = cataloger.catalog(&opts.source)?;

    if opts.release.base_url.is_empty() {
        warn!("base URL is empty; clients will resolve paths relative to nothing");
    }
    let date = opts.release_date.unwrap_or_else(today);
    let manifest = assemble(catalog.records, &opts.release, date);
    write_manifest(&manifest, &opts.output)?;

    info!(
        files = manifest.files.len(),
        skipped = catalog.skipped.len(),
        excluded = catalog.excluded,
        output = %opts.output.display(),
        "manifest written"
    );
    Ok(BuildReport {
        manifest,
        output: opts.output.clone(),
        excluded: catalog.excluded,
        skipped: catalog.skipped,
    })
}

/// Relative path of `output` when it would land inside `source`.
fn output_within(source: &Path, output: &Path) -> Option<String> {
    let src = std::fs::canonicalize(source).ok()?;
    let name = output.file_name()?;
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let out = std::fs::canonicalize(parent).ok()?.join(name);
    if out.starts_with(&src) {
        rel_path(&src, &out)
    } else {
        None
    }
}
