//! Error types for ASCII response parsing.

use grid_common::GridError;
use thiserror::Error;

/// Result type for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Error types for parsing. Every variant aborts the whole variable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// No shape header for the variable anywhere in the response
    #[error("No header for variable '{0}'")]
    MissingHeader(String),

    /// A declared dimension is not a non-negative integer
    #[error("Invalid dimension '{token}' for variable '{variable}'")]
    InvalidDimension { variable: String, token: String },

    /// Rank outside the supported range
    #[error("Variable '{variable}' has unsupported rank {rank}")]
    UnsupportedRank { variable: String, rank: usize },

    /// Number of scalars differs from the declared shape
    #[error("Variable '{variable}' declares {expected} values, found {found}")]
    CountMismatch {
        variable: String,
        expected: usize,
        found: usize,
    },

    /// A scalar token is not a number
    #[error("Bad number '{token}' for variable '{variable}' on line {line}")]
    InvalidToken {
        variable: String,
        line: usize,
        token: String,
    },

    /// A data row does not have the expected layout
    #[error("Malformed row for variable '{variable}' on line {line}")]
    MalformedRow { variable: String, line: usize },

    /// The same axis has different lengths in two places
    #[error("Axis '{axis}' has length {expected} in '{first}' but {found} in '{second}'")]
    AxisMismatch {
        axis: String,
        expected: usize,
        found: usize,
        first: String,
        second: String,
    },

    /// A required metadata attribute is absent or unusable
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    /// Metadata present but describing something unusable
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl ParseError {
    pub fn missing_header(variable: impl Into<String>) -> Self {
        Self::MissingHeader(variable.into())
    }

    pub fn malformed_row(variable: impl Into<String>, line: usize) -> Self {
        Self::MalformedRow {
            variable: variable.into(),
            line,
        }
    }
}

impl From<ParseError> for GridError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::MissingHeader(_) | ParseError::MissingAttribute(_) => {
                GridError::MissingData(err.to_string())
            }
            ParseError::CountMismatch { .. }
            | ParseError::AxisMismatch { .. }
            | ParseError::UnsupportedRank { .. } => GridError::DimensionMismatch(err.to_string()),
            _ => GridError::InvalidFormat(err.to_string()),
        }
    }
}
