//! Coordinate reference system transformations for ocean model grids.
//!
//! Polar stereographic formulas are implemented directly; the affine
//! projection uses `nalgebra` for its 2x2 inverse.
//!
//! A [`ProjectionDefinition`] ties a projection to a regular grid so that a
//! geographic point resolves to its grid cell in O(1):
//!
//! ```text
//! (lat, lon) ──project──► (northing, easting) meters ──to_index──► (row, column)
//! ```

pub mod definition;
pub mod error;
pub mod linear;
pub mod stereographic;

pub use definition::{
    nearest_cell_brute_force, to_index, CellSize, GridExtent, GridIndex, MapProjection,
    ProjectedPoint, ProjectionDefinition, ProjectionKind,
};
pub use error::{ProjectionError, ProjectionResult};
pub use linear::LinearProjection;
pub use stereographic::{Ellipsoid, PolarStereographic};
