use chrono::{Local, NaiveDate};

use crate::manifest::{FileRecord, Manifest, DISTRIBUTION, SCHEMA_VERSION};

/// Catalog-level values chosen by whoever publishes the release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    pub channel: String,
    pub base_url: String,
    pub distribution: String,
}

impl Default for ReleaseInfo {
    fn default() -> Self {
        Self {
            version: "0.0.0".into(),
            channel: "stable".into(),
            base_url: String::new(),
            distribution: DISTRIBUTION.into(),
        }
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Wrap already-ordered records with catalog metadata. Record order is kept
/// as given.
pub fn assemble(files: Vec<FileRecord>, release: &ReleaseInfo, release_date: NaiveDate) -> Manifest {
    Manifest {
        schema_version: SCHEMA_VERSION.to_string(),
        distribution: release.distribution.clone(),
        version: release.version.clone(),
        channel: release.channel.clone(),
        release_date: release_date.format("%Y-%m-%d").to_string(),
        base_url: release.base_url.clone(),
        files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str) -> FileRecord {
        FileRecord {
            path: path.into(),
            version: "2026.01.18".into(),
            sha256: "ab".repeat(32),
            size: 3,
            permissions: "755".into(),
            description: String::new(),
        }
    }

    #[test]
    fn wraps_records_in_given_order() {
        let release = ReleaseInfo {
            version: "5.0.1".into(),
            channel: "personal".into(),
            base_url: "https://example.org/et".into(),
            distribution: DISTRIBUTION.into(),
        };
        let date = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        let m = assemble(vec![rec("a"), rec("b/c"), rec("b/d")], &release, date);
        assert_eq!(m.schema_version, SCHEMA_VERSION);
        assert_eq!(m.distribution, "EmComm-Tools");
        assert_eq!(m.version, "5.0.1");
        assert_eq!(m.channel, "personal");
        assert_eq!(m.release_date, "2026-01-08");
        assert_eq!(m.base_url, "https://example.org/et");
        let paths: Vec<_> = m.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["a", "b/c", "b/d"]);
    }

    #[test]
    fn default_release() {
        let r = ReleaseInfo::default();
        assert_eq!(r.channel, "stable");
        assert_eq!(r.version, "0.0.0");
        assert!(r.base_url.is_empty());
    }
}
