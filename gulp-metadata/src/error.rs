//! Error types for gulp-metadata.

use std::path::PathBuf;

use thiserror::Error;

use gulp_core::SourceError;
use gulp_renderer::RenderError;
use gulp_sync::SyncError;

/// Failures while parsing or reshaping a metadata document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Well-formed XML that does not look like the expected metadata.
    #[error("unexpected document shape: {0}")]
    Shape(String),
}

/// Everything that can stop a single reader.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("remote source error: {0}")]
    Source(#[from] SourceError),

    #[error("failed to process definition of {name}: {source}")]
    Document {
        name: String,
        #[source]
        source: DocumentError,
    },

    #[error("retrieve archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("mirror store error: {0}")]
    Sync(#[from] SyncError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A reader's failure, captured as a value so sibling readers keep running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reader} reader failed: {cause}")]
pub struct Failure {
    pub reader: &'static str,
    pub cause: String,
}

impl Failure {
    pub fn new(reader: &'static str, err: &ReaderError) -> Self {
        Self {
            reader,
            cause: err.to_string(),
        }
    }
}

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum GulpError {
    #[error("failed to resolve home namespace: {0}")]
    HomeNamespace(#[source] SourceError),

    #[error("mirror store error: {0}")]
    Sync(#[from] SyncError),

    /// At least one reader failed; the mirror was not synced.
    #[error("{failure} ({failed} reader(s) failed, mirror left unchanged)")]
    Reader { failure: Failure, failed: usize },
}

/// Convenience constructor for [`ReaderError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ReaderError {
    ReaderError::Io {
        path: path.into(),
        source,
    }
}
