use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions a caller needs to tell apart. These travel inside
/// `anyhow::Error`; use `downcast_ref::<CatalogError>()` to recover them.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("source directory not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("source path is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("source directory unreadable: {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern {pattern:?}: {reason}")]
    InvalidExclude { pattern: String, reason: String },

    #[error("failed to write manifest {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error("unsupported manifest schema {found:?} (expected {expected:?})")]
    SchemaMismatch { found: String, expected: String },
}

impl CatalogError {
    /// Configuration errors abort before any scanning or output.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CatalogError::SourceMissing(_)
                | CatalogError::SourceNotDirectory(_)
                | CatalogError::SourceUnreadable { .. }
                | CatalogError::InvalidExclude { .. }
        )
    }
}
