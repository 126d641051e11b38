use anyhow::Result;
use std::path::Path;
use tracing::warn;

use crate::catalog::sha256_file;
use crate::manifest::Manifest;
use crate::path_safety::{validate_path, PathPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    Missing,
    SizeMismatch { expected: u64, actual: u64 },
    ChecksumMismatch { expected: String, actual: String },
    Unsafe(String),
}

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub files_ok: u64,
    pub problems: Vec<(String, Problem)>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn verify(manifest_path: &Path, root: &Path) -> Result<VerifyReport> {
    verify_with_policy(manifest_path, root, PathPolicy::default())
}

/// Re-hash every file the manifest lists under `root` and compare size and
/// SHA-256. Files present on disk but absent from the manifest are ignored.
pub fn verify_with_policy(manifest_path: &Path, root: &Path, policy: PathPolicy) -> Result<VerifyReport> {
    let mf = Manifest::load(manifest_path)?;
    let mut rep = VerifyReport::default();
    for rec in &mf.files {
        let p = match validate_path(root, &rec.path, policy) {
            Ok(p) => p,
            // canonicalize fails with an io error when the target is gone
            Err(e) if e.downcast_ref::<std::io::Error>().is_some() => {
                rep.problems.push((rec.path.clone(), Problem::Missing));
                continue;
            }
            Err(e) => {
                rep.problems.push((rec.path.clone(), Problem::Unsafe(format!("{e:#}"))));
                continue;
            }
        };
        if !p.is_file() {
            rep.problems.push((rec.path.clone(), Problem::Missing));
            continue;
        }
        let (actual, size) = match sha256_file(&p) {
            Ok(v) => v,
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(path = %rec.path, %reason, "unreadable during verify");
                rep.problems.push((rec.path.clone(), Problem::Missing));
                continue;
            }
        };
        if size != rec.size {
            rep.problems.push((rec.path.clone(), Problem::SizeMismatch { expected: rec.size, actual: size }));
        } else if actual != rec.sha256 {
            rep.problems.push((
                rec.path.clone(),
                Problem::ChecksumMismatch { expected: rec.sha256.clone(), actual },
            ));
        } else {
            rep.files_ok += 1;
        }
    }
    Ok(rep)
}
