//! Error types for grid data acquisition.
//!
//! Errors fall into three kinds: network failures (transient, worth a
//! retry), format failures (the response is not what we expect) and
//! location failures (a point cannot be resolved to a grid cell). All of
//! them become a plain "no data" outcome at the repository boundary via
//! [`NoDataExt::or_no_data`], after the cause has been logged.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Primary error type for grid acquisition operations.
#[derive(Debug, Error)]
pub enum GridError {
    // === Network Errors ===
    #[error("Request to {url} failed: {message}")]
    RequestFailed { url: String, message: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Empty response body from {0}")]
    EmptyBody(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    // === Format Errors ===
    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    // === Location Errors ===
    #[error("Cannot resolve location: {0}")]
    UnresolvedLocation(String),

    #[error("Index {requested} outside extent {extent} on axis '{axis}'")]
    OutOfBounds {
        axis: String,
        requested: usize,
        extent: usize,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Format,
    Location,
    Config,
}

impl GridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GridError::RequestFailed { .. }
            | GridError::HttpStatus { .. }
            | GridError::EmptyBody(_)
            | GridError::Timeout(_) => ErrorKind::Network,

            GridError::MissingData(_)
            | GridError::InvalidFormat(_)
            | GridError::DimensionMismatch(_) => ErrorKind::Format,

            GridError::UnresolvedLocation(_) | GridError::OutOfBounds { .. } => {
                ErrorKind::Location
            }

            GridError::Config(_) => ErrorKind::Config,
        }
    }

    /// Network failures may succeed on a later attempt; nothing else will.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    /// Create a MissingData error.
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingData(msg.into())
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create an UnresolvedLocation error.
    pub fn unresolved(msg: impl Into<String>) -> Self {
        Self::UnresolvedLocation(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Collapses a detailed result into the uniform "no data" outcome.
pub trait NoDataExt<T> {
    /// Log the error (if any) under `context` and discard its cause.
    fn or_no_data(self, context: &str) -> Option<T>;
}

impl<T, E> NoDataExt<T> for Result<T, E>
where
    E: Into<GridError>,
{
    fn or_no_data(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let err: GridError = err.into();
                match err.kind() {
                    ErrorKind::Network => {
                        tracing::warn!(context, error = %err, "Network failure, no data")
                    }
                    ErrorKind::Location => {
                        tracing::debug!(context, error = %err, "Location unresolved, no data")
                    }
                    ErrorKind::Format | ErrorKind::Config => {
                        tracing::error!(context, error = %err, "Unusable response, no data")
                    }
                }
                None
            }
        }
    }
}
