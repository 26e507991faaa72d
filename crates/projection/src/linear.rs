//! Affine projection between projected meters and geographic degrees.
//!
//! Small regional grids are sometimes published with a plain linear
//! relation between grid meters and lat/lon:
//!
//! ```text
//! [lat]   [a00 a01] [northing]   [lat0]
//! [lon] = [a10 a11] [easting ] + [lon0]
//! ```
//!
//! The inverse is computed once at construction.

use nalgebra::{Matrix2, Vector2};

use crate::definition::{MapProjection, ProjectedPoint};
use crate::error::{ProjectionError, ProjectionResult};

#[derive(Debug, Clone, PartialEq)]
pub struct LinearProjection {
    /// Maps (northing, easting) meters to (lat, lon) degrees
    to_geographic: Matrix2<f64>,
    /// Inverse of `to_geographic`
    to_projected: Matrix2<f64>,
    /// Geographic position of projected (0, 0)
    offset: Vector2<f64>,
}

impl LinearProjection {
    /// Create from the row-major 2x2 matrix and the geographic offset.
    ///
    /// Fails if the matrix is singular or contains non-finite entries.
    pub fn new(matrix: [[f64; 2]; 2], offset: (f64, f64)) -> ProjectionResult<Self> {
        let to_geographic =
            Matrix2::new(matrix[0][0], matrix[0][1], matrix[1][0], matrix[1][1]);
        if to_geographic.iter().any(|v| !v.is_finite()) {
            return Err(ProjectionError::InvalidDefinition(
                "non-finite linear projection coefficient".to_string(),
            ));
        }
        let to_projected = to_geographic.try_inverse().ok_or_else(|| {
            ProjectionError::InvalidDefinition("linear projection matrix is singular".to_string())
        })?;

        Ok(Self {
            to_geographic,
            to_projected,
            offset: Vector2::new(offset.0, offset.1),
        })
    }

    /// Axis-aligned grid: `deg_per_meter_lat` degrees of latitude per meter
    /// northing, `deg_per_meter_lon` degrees of longitude per meter easting.
    pub fn axis_aligned(
        deg_per_meter_lat: f64,
        deg_per_meter_lon: f64,
        offset: (f64, f64),
    ) -> ProjectionResult<Self> {
        Self::new([[deg_per_meter_lat, 0.0], [0.0, deg_per_meter_lon]], offset)
    }
}

impl MapProjection for LinearProjection {
    fn forward(&self, lat: f64, lon: f64) -> Option<ProjectedPoint> {
        let projected = self.to_projected * (Vector2::new(lat, lon) - self.offset);
        Some(ProjectedPoint {
            northing: projected[0],
            easting: projected[1],
        })
    }

    fn inverse(&self, point: ProjectedPoint) -> (f64, f64) {
        let geo = self.to_geographic * Vector2::new(point.northing, point.easting) + self.offset;
        (geo[0], geo[1])
    }
}
