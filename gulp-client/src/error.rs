//! Error types for gulp-client.

use std::time::Duration;

use thiserror::Error;

use gulp_core::SourceError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS or timeout failure before any response arrived.
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("invalid response body from {endpoint}: {message}")]
    Body { endpoint: String, message: String },

    #[error("SOAP fault: {0}")]
    Fault(String),

    #[error("malformed SOAP response: {0}")]
    Soap(String),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid base64 archive: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("retrieve failed: {0}")]
    Retrieve(String),

    #[error("retrieve did not finish within {0:?}")]
    Timeout(Duration),

    #[error("blocking request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<ClientError> for SourceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport { endpoint, message } => SourceError::Request { endpoint, message },
            ClientError::Status {
                status, message, ..
            } => SourceError::Rejected { status, message },
            ClientError::Fault(message) => SourceError::Rejected {
                status: 500,
                message,
            },
            ClientError::Retrieve(message) => SourceError::Retrieve(message),
            ClientError::Timeout(after) => SourceError::Timeout(after),
            ClientError::Join(join) => SourceError::Request {
                endpoint: "blocking task".to_string(),
                message: join.to_string(),
            },
            other @ (ClientError::Body { .. }
            | ClientError::Soap(_)
            | ClientError::Xml(_)
            | ClientError::Base64(_)) => SourceError::Shape(other.to_string()),
        }
    }
}
