//! Error types for gulp-core.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures reported by a [`RemoteSource`](crate::source::RemoteSource).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request never produced a usable response (connection, I/O, runtime).
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    /// The remote organization answered with an error status.
    #[error("remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response arrived but did not have the expected structure.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// A record could not be decoded into its typed form.
    #[error("record decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A metadata retrieve finished without producing an archive.
    #[error("metadata retrieve failed: {0}")]
    Retrieve(String),

    /// A metadata retrieve did not finish inside the poll window.
    #[error("metadata retrieve timed out after {0:?}")]
    Timeout(Duration),
}

/// All errors that can arise while loading workspace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; carries the file path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A setting required by the caller was not provided by file or environment.
    #[error("missing configuration value `{0}`; set it in .apexlink/gulp.yaml or the environment")]
    Missing(&'static str),
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
