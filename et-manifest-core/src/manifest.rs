use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::CatalogError;

/// Document shape consumers must expect. Bump the major part on breaking changes.
pub const SCHEMA_VERSION: &str = "1.0";

pub const DISTRIBUTION: &str = "EmComm-Tools";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Relative to the source root, forward-slash separated.
    pub path: String,
    pub version: String,
    pub sha256: String,
    pub size: u64,
    /// Octal POSIX mode bits, e.g. "755".
    pub permissions: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    pub schema_version: String,
    pub distribution: String,
    pub version: String,
    pub channel: String,
    pub release_date: String,
    pub base_url: String,
    pub files: Vec<FileRecord>,
}

impl Manifest {
    /// Parse a manifest from disk. Unknown fields are ignored; a schema with a
    /// different major version is rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let f = File::open(path).with_context(|| format!("open {:?}", path))?;
        let mf: Manifest = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse manifest {:?}", path))?;
        check_schema(&mf.schema_version)?;
        Ok(mf)
    }

    /// Where a client fetches `record` from: `base_url` + `/` + `path`.
    pub fn download_url(&self, record: &FileRecord) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), record.path)
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn find(&self, path: &str) -> Option<&FileRecord> {
        self.files.binary_search_by(|r| r.path.as_str().cmp(path)).ok().map(|i| &self.files[i])
    }
}

fn major(v: &str) -> &str {
    v.split('.').next().unwrap_or(v)
}

/// Minor revisions only add fields, so any `1.x` parses as `1.0`.
pub fn check_schema(found: &str) -> Result<()> {
    if major(found) != major(SCHEMA_VERSION) {
        return Err(CatalogError::SchemaMismatch {
            found: found.to_string(),
            expected: SCHEMA_VERSION.to_string(),
        }
        .into());
    }
    Ok(())
}
