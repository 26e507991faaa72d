//! Error types for projection operations.

use grid_common::GridError;
use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Projection parameters are unusable (singular matrix, bad ellipsoid, ...)
    #[error("Invalid projection definition: {0}")]
    InvalidDefinition(String),

    /// The point is not representable in the projection.
    #[error("Coordinate ({lat}, {lon}) cannot be projected: {reason}")]
    Unprojectable { lat: f64, lon: f64, reason: String },
}

// A broken definition is a configuration problem, but callers only ever
// see that the location could not be resolved.
impl From<ProjectionError> for GridError {
    fn from(err: ProjectionError) -> Self {
        GridError::UnresolvedLocation(err.to_string())
    }
}
