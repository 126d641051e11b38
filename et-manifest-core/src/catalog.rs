use anyhow::{Context, Result};
use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::fs::{self, File, Metadata};
use std::ops::Deref;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::CatalogError;
use crate::exclude::ExcludeSet;
use crate::extract;
use crate::manifest::FileRecord;

#[derive(Clone, Debug, Default)]
pub struct CatalogConfig {
    pub exclude: ExcludeSet,
    pub follow_symlinks: bool,
}

/// A file the walk found but could not include.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    /// Sorted by `path`, byte-wise.
    pub records: Vec<FileRecord>,
    pub skipped: Vec<SkippedFile>,
    /// Entries dropped by the exclude set; a pruned directory counts once.
    pub excluded: usize,
}

pub struct Cataloger {
    cfg: CatalogConfig,
}

impl Cataloger {
    pub fn new(cfg: CatalogConfig) -> Self {
        Self { cfg }
    }

    /// Walk `root` and build one record per included file. A missing or
    /// unreadable root fails the whole call; anything wrong with a single
    /// file is logged and recorded in [`Catalog::skipped`].
    pub fn catalog(&self, root: &Path) -> Result<Catalog> {
        check_root(root)?;

        let mut out = Catalog::default();
        let exclude = &self.cfg.exclude;
        let mut excluded = 0usize;
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.cfg.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let rel = lossy_rel_path(root, e.path());
                if exclude.is_excluded(&rel) {
                    trace!(path = %rel, "excluded");
                    excluded += 1;
                    return false;
                }
                true
            });

        for ent in walker {
            let ent = match ent {
                Ok(ent) => ent,
                Err(e) => {
                    let path = e.path().map(|p| lossy_rel_path(root, p)).unwrap_or_default();
                    warn!(path = %path, error = %e, "skipping unreadable entry");
                    out.skipped.push(SkippedFile { path, reason: e.to_string() });
                    continue;
                }
            };
            let ft = ent.file_type();
            if ft.is_dir() {
                continue;
            }
            let Some(rel) = rel_path(root, ent.path()) else {
                let path = lossy_rel_path(root, ent.path());
                warn!(path = %path, "skipping file with non-UTF-8 name");
                out.skipped.push(SkippedFile { path, reason: "file name is not valid UTF-8".into() });
                continue;
            };
            if ft.is_symlink() {
                warn!(path = %rel, "skipping symlink (not following)");
                out.skipped.push(SkippedFile { path: rel, reason: "symlink not followed".into() });
                continue;
            }
            if !ft.is_file() {
                warn!(path = %rel, "skipping special file");
                out.skipped.push(SkippedFile { path: rel, reason: "not a regular file".into() });
                continue;
            }
            match catalog_file(ent.path(), rel.clone()) {
                Ok(rec) => out.records.push(rec),
                Err(e) => {
                    let reason = format!("{e:#}");
                    warn!(path = %rel, %reason, "skipping file");
                    out.skipped.push(SkippedFile { path: rel, reason });
                }
            }
        }

        out.excluded = excluded;
        // Walk order is per-directory; the manifest wants whole-path byte order.
        out.records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}

fn check_root(root: &Path) -> Result<()> {
    let md = match fs::metadata(root) {
        Ok(md) => md,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CatalogError::SourceMissing(root.to_path_buf()).into());
        }
        Err(source) => {
            return Err(CatalogError::SourceUnreadable { path: root.to_path_buf(), source }.into());
        }
    };
    if !md.is_dir() {
        return Err(CatalogError::SourceNotDirectory(root.to_path_buf()).into());
    }
    fs::read_dir(root)
        .map_err(|source| CatalogError::SourceUnreadable { path: root.to_path_buf(), source })?;
    Ok(())
}

/// Forward-slash path of `path` relative to `root`, or `None` when a
/// component is not valid UTF-8.
pub fn rel_path(root: &Path, path: &Path) -> Option<String> {
    let rel = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    rel.components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join("/"))
}

/// Like [`rel_path`] but never fails; only for matching and diagnostics.
fn lossy_rel_path(root: &Path, path: &Path) -> String {
    let rel = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Build the record for one file. Checksum, size, and extractor input all
/// come from a single read of the content.
pub fn catalog_file(path: &Path, rel: String) -> Result<FileRecord> {
    let f = File::open(path).with_context(|| format!("open {:?}", path))?;
    let md = f.metadata().with_context(|| format!("stat {:?}", path))?;
    let content = Content::read(&f, &md).with_context(|| format!("read {:?}", path))?;
    let modified = md.modified().unwrap_or(SystemTime::UNIX_EPOCH);

    let sha256 = sha256_hex(&content);
    let size = content.len() as u64;
    let found = extract::extract(&content, modified);
    match found.version_rule {
        Some(rule) => debug!(path = %rel, rule, version = %found.version, "version"),
        None => debug!(path = %rel, version = %found.version, "version from mtime"),
    }

    Ok(FileRecord {
        path: rel,
        version: found.version,
        sha256,
        size,
        permissions: permissions(&md),
        description: found.description,
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Stream a file through SHA-256; returns `(hex digest, byte count)`.
pub fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let mut f = File::open(path).with_context(|| format!("open {:?}", path))?;
    let mut hasher = Sha256::new();
    let n = std::io::copy(&mut f, &mut hasher).with_context(|| format!("read {:?}", path))?;
    Ok((hex::encode(hasher.finalize()), n))
}

#[cfg(unix)]
pub fn permissions(md: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:o}", md.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
pub fn permissions(md: &Metadata) -> String {
    if md.permissions().readonly() { "444".into() } else { "644".into() }
}

/// File bytes, memory-mapped when non-empty.
enum Content {
    Mapped(Mmap),
    Empty,
}

impl Content {
    fn read(f: &File, md: &Metadata) -> std::io::Result<Self> {
        if md.len() == 0 {
            return Ok(Content::Empty);
        }
        // Release trees are quiescent while cataloged; a concurrent writer is
        // outside what this guards against.
        let map = unsafe { Mmap::map(f)? };
        Ok(Content::Mapped(map))
    }
}

impl Deref for Content {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Content::Mapped(m) => &m[..],
            Content::Empty => &[],
        }
    }
}
