use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::CatalogError;

/// Build artifacts, VCS metadata, editor leftovers, OS droppings.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*.pyc",
    "**/*.pyo",
    "**/__pycache__",
    "**/.git",
    "**/.svn",
    "**/.hg",
    "**/.gitmodules",
    "**/*.swp",
    "**/*.swo",
    "**/*.bak",
    "**/*~",
    "**/.DS_Store",
];

/// Glob patterns matched against forward-slash paths relative to the source
/// root. A pattern that matches a directory prunes everything beneath it.
#[derive(Clone, Debug)]
pub struct ExcludeSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExcludeSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CatalogError> {
        let mut b = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());
        for p in patterns {
            let p = p.as_ref();
            let g = Glob::new(p).map_err(|e| CatalogError::InvalidExclude {
                pattern: p.to_string(),
                reason: e.kind().to_string(),
            })?;
            b.add(g);
            kept.push(p.to_string());
        }
        let set = b.build().map_err(|e| CatalogError::InvalidExclude {
            pattern: kept.join(","),
            reason: e.to_string(),
        })?;
        Ok(Self { patterns: kept, set })
    }

    pub fn defaults() -> Self {
        Self::new(DEFAULT_EXCLUDES).expect("default exclude patterns are valid")
    }

    /// Defaults (unless `use_defaults` is false) followed by `extra`.
    pub fn with_extra<S: AsRef<str>>(use_defaults: bool, extra: &[S]) -> Result<Self, CatalogError> {
        let mut all: Vec<String> = Vec::new();
        if use_defaults {
            all.extend(DEFAULT_EXCLUDES.iter().map(|s| s.to_string()));
        }
        all.extend(extra.iter().map(|s| s.as_ref().to_string()));
        Self::new(all.as_slice())
    }

    pub fn empty() -> Self {
        Self::new::<&str>(&[]).expect("empty glob set")
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Adds one literal path (e.g. the output manifest living inside the tree).
    pub fn with_literal(&self, rel_path: &str) -> Result<Self, CatalogError> {
        let mut all = self.patterns.clone();
        all.push(globset::escape(rel_path));
        Self::new(all.as_slice())
    }
}

impl Default for ExcludeSet {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_at_any_depth() {
        let ex = ExcludeSet::defaults();
        for p in [
            ".DS_Store",
            "bin/.DS_Store",
            "a/b/c/.DS_Store",
            "__pycache__",
            "bin/et-flask-apps/et-radio/__pycache__",
            "lib/mod.pyc",
            "lib/mod.pyo",
            ".git",
            "vendor/thing/.git",
            "conf/radios.d/ic705.json.bak",
            "bin/.et-radio.swp",
            "notes.txt~",
        ] {
            assert!(ex.is_excluded(p), "{p} should be excluded");
        }
    }

    #[test]
    fn defaults_keep_regular_files() {
        let ex = ExcludeSet::defaults();
        for p in [
            "bin/et-radio",
            "bin/et-flask-apps/et-radio/et-radio.py",
            "conf/radios.d/ic705.json",
            ".gitignore",
            "docs/pycache_notes.md",
            "bak/readme",
        ] {
            assert!(!ex.is_excluded(p), "{p} should be kept");
        }
    }

    #[test]
    fn extra_patterns_and_no_defaults() {
        let ex = ExcludeSet::with_extra(false, &["**/*.log"]).unwrap();
        assert!(ex.is_excluded("var/run.log"));
        assert!(!ex.is_excluded("lib/mod.pyc"));
        assert_eq!(ex.patterns(), ["**/*.log"]);
    }

    #[test]
    fn literal_is_escaped() {
        let ex = ExcludeSet::empty().with_literal("out/manifest[1].json").unwrap();
        assert!(ex.is_excluded("out/manifest[1].json"));
        assert!(!ex.is_excluded("out/manifest1.json"));
    }

    #[test]
    fn invalid_pattern_is_configuration_error() {
        let err = ExcludeSet::new(&["a/[b"]).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, CatalogError::InvalidExclude { .. }));
    }
}
