use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::CatalogError;
use crate::manifest::Manifest;

/// Pretty JSON with a trailing newline.
pub fn to_json(manifest: &Manifest) -> Result<String> {
    let mut s = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    s.push('\n');
    Ok(s)
}

/// Serialize `manifest` and replace `dest` atomically: the bytes go to a
/// temporary file in the same directory, are synced, then renamed over
/// `dest`. On any failure `dest` keeps its previous content.
pub fn write_manifest(manifest: &Manifest, dest: &Path) -> Result<()> {
    let body = to_json(manifest)?;
    write_atomic(dest, body.as_bytes())
}

pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let fail = |reason: String| CatalogError::Write { path: dest.to_path_buf(), reason };

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .map_err(|e| fail(format!("create directory {}: {e}", parent.display())))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| fail(format!("create temp file in {}: {e}", parent.display())))?;
    tmp.write_all(bytes).map_err(|e| fail(format!("write temp file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // NamedTempFile is created 0600; published manifests are world-readable.
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| fail(format!("set permissions: {e}")))?;
    }

    tmp.as_file().sync_all().map_err(|e| fail(format!("sync temp file: {e}")))?;
    tmp.persist(dest).map_err(|e| fail(format!("replace destination: {}", e.error)))?;

    // The rename is only durable once the directory entry is on disk.
    #[cfg(unix)]
    fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| fail(format!("sync directory {}: {e}", parent.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{assemble, ReleaseInfo};
    use chrono::NaiveDate;

    fn sample() -> Manifest {
        let date = NaiveDate::from_ymd_opt(2026, 1, 18).unwrap();
        assemble(Vec::new(), &ReleaseInfo::default(), date)
    }

    #[test]
    fn json_field_order_is_stable() {
        let s = to_json(&sample()).unwrap();
        let keys = ["schema_version", "distribution", "version", "channel", "release_date", "base_url", "files"];
        let mut last = 0;
        for k in keys {
            let pos = s.find(&format!("\"{k}\"")).unwrap_or_else(|| panic!("missing {k}"));
            assert!(pos >= last, "{k} out of order");
            last = pos;
        }
        assert!(s.ends_with("}\n"));
    }

    #[test]
    fn creates_missing_parent_and_leaves_no_temp_files() {
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("out/nested/manifest.json");
        write_manifest(&sample(), &dest).unwrap();
        let names: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["manifest.json"]);
    }

    #[cfg(unix)]
    #[test]
    fn replaces_existing_file_and_publishes_readable() {
        use std::os::unix::fs::PermissionsExt;

        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("manifest.json");
        fs::write(&dest, "stale").unwrap();
        write_atomic(&dest, b"{}\n").unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"{}\n");
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
