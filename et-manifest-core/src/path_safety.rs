use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

#[derive(Clone, Copy, Debug, Default)]
pub struct PathPolicy {
    pub follow_symlinks: bool,
}

/// Resolve a manifest `path` (forward slashes) under `root`.
///
/// Rejects empty, absolute, and `..` paths. Without `follow_symlinks` any
/// symlink on the way is an error; with it, the canonical target must stay
/// under `root`.
pub fn validate_path(root: &Path, manifest_path: &str, policy: PathPolicy) -> Result<PathBuf> {
    if manifest_path.is_empty() {
        bail!("empty path in manifest");
    }
    if manifest_path.starts_with('/') || manifest_path.contains('\\') {
        bail!("absolute or non-portable path not allowed: {:?}", manifest_path);
    }
    let rel: PathBuf = manifest_path.split('/').collect();
    for comp in rel.components() {
        match comp {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => bail!("parent traversal not allowed: {:?}", manifest_path),
            _ => bail!("absolute or non-portable path not allowed: {:?}", manifest_path),
        }
    }

    let candidate = root.join(&rel);
    if policy.follow_symlinks {
        let root_can = std::fs::canonicalize(root)?;
        let cand_can = std::fs::canonicalize(&candidate)?;
        if !cand_can.starts_with(&root_can) {
            bail!("path escapes root: {:?}", manifest_path);
        }
        return Ok(cand_can);
    }

    let mut cur = root.to_path_buf();
    for comp in rel.components() {
        cur.push(comp);
        if let Ok(m) = std::fs::symlink_metadata(&cur) {
            if m.file_type().is_symlink() {
                bail!("symlink in path (not following): {:?}", cur);
            }
        }
    }
    Ok(candidate)
}
