//! Error types for remote grid access.

use dap_parser::ParseError;
use grid_common::GridError;
use projection::ProjectionError;
use thiserror::Error;

/// Result type for remote source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Connection refused, reset, DNS failure and similar
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Empty response body from {url}")]
    EmptyBody { url: String },

    #[error("Invalid JSON from {url}: {message}")]
    Json { url: String, message: String },

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// The blocking parse task panicked or was cancelled
    #[error("Parse task failed: {0}")]
    Task(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SourceError {
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Request { url, source }
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Whether repeating the same request may succeed.
    ///
    /// Client errors (4xx other than 429) and format errors are final.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Request { source, .. } => !source.is_builder(),
            SourceError::Timeout { .. } | SourceError::EmptyBody { .. } => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<SourceError> for GridError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Request { url, source } => GridError::RequestFailed {
                url,
                message: source.to_string(),
            },
            SourceError::Timeout { url } => GridError::Timeout(url),
            SourceError::Status { url, status } => GridError::HttpStatus { url, status },
            SourceError::EmptyBody { url } => GridError::EmptyBody(url),
            SourceError::Json { .. } | SourceError::Catalog(_) | SourceError::Task(_) => {
                GridError::InvalidFormat(err.to_string())
            }
            SourceError::Parse(e) => e.into(),
            SourceError::Projection(e) => e.into(),
            SourceError::Credential(msg) | SourceError::Config(msg) => GridError::Config(msg),
        }
    }
}
