//! Error types for gulp-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from mirror store operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A staged path that would escape the store root.
    #[error("staged path must be relative and stay inside the store: {path}")]
    InvalidPath { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
