//! Projection definitions bound to a regular grid.

use grid_common::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, ProjectionResult};
use crate::linear::LinearProjection;
use crate::stereographic::PolarStereographic;

/// A position in projected meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub northing: f64,
    pub easting: f64,
}

impl ProjectedPoint {
    pub fn new(northing: f64, easting: f64) -> Self {
        Self { northing, easting }
    }
}

/// A map projection between geographic degrees and projected meters.
pub trait MapProjection {
    /// Project a geographic point. `None` if the point has no finite image.
    fn forward(&self, lat: f64, lon: f64) -> Option<ProjectedPoint>;

    /// Inverse projection, returning (lat, lon) in degrees.
    fn inverse(&self, point: ProjectedPoint) -> (f64, f64);
}

/// Supported projection families.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionKind {
    PolarStereographic(PolarStereographic),
    Linear(LinearProjection),
}

impl MapProjection for ProjectionKind {
    fn forward(&self, lat: f64, lon: f64) -> Option<ProjectedPoint> {
        match self {
            ProjectionKind::PolarStereographic(p) => p.forward(lat, lon),
            ProjectionKind::Linear(p) => p.forward(lat, lon),
        }
    }

    fn inverse(&self, point: ProjectedPoint) -> (f64, f64) {
        match self {
            ProjectionKind::PolarStereographic(p) => p.inverse(point),
            ProjectionKind::Linear(p) => p.inverse(point),
        }
    }
}

/// Grid cell size in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSize {
    pub dx: f64,
    pub dy: f64,
}

/// Number of rows (Y) and columns (X) of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridExtent {
    pub rows: usize,
    pub columns: usize,
}

impl GridExtent {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub fn max_row(&self) -> usize {
        self.rows.saturating_sub(1)
    }

    pub fn max_column(&self) -> usize {
        self.columns.saturating_sub(1)
    }

    /// Whether (row, column) lies at least `margin` cells inside the edges.
    pub fn is_interior(&self, index: GridIndex, margin: usize) -> bool {
        index.row >= margin
            && index.column >= margin
            && index.row + margin <= self.max_row()
            && index.column + margin <= self.max_column()
    }

    /// The square window of `radius` cells around `center`, clipped to the
    /// grid. Returns its first cell and its extent.
    pub fn window(&self, center: GridIndex, radius: usize) -> (GridIndex, GridExtent) {
        let first = GridIndex::new(
            center.row.saturating_sub(radius).min(self.max_row()),
            center.column.saturating_sub(radius).min(self.max_column()),
        );
        let last_row = center.row.saturating_add(radius).min(self.max_row());
        let last_column = center.column.saturating_add(radius).min(self.max_column());
        (
            first,
            GridExtent::new(
                last_row.saturating_sub(first.row) + 1,
                last_column.saturating_sub(first.column) + 1,
            ),
        )
    }
}

/// An integer grid position, always inside the extent it was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridIndex {
    pub row: usize,
    pub column: usize,
}

impl GridIndex {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Clamp signed coordinates into `[0, max_row] x [0, max_column]`.
    pub fn clamped(row: i64, column: i64, extent: GridExtent) -> Self {
        Self {
            row: row.clamp(0, extent.max_row() as i64) as usize,
            column: column.clamp(0, extent.max_column() as i64) as usize,
        }
    }
}

/// Convert grid-relative meters to the nearest cell.
///
/// Rounds half away from zero, then clamps into the grid.
pub fn to_index(northing: f64, easting: f64, cell: CellSize, extent: GridExtent) -> GridIndex {
    let row = (northing / cell.dy).round() as i64;
    let column = (easting / cell.dx).round() as i64;
    GridIndex::clamped(row, column, extent)
}

/// A projection bound to a regular grid.
///
/// Immutable once built and shared read-only between queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionDefinition {
    pub kind: ProjectionKind,
    /// Projected position of the centre of cell (0, 0)
    pub origin: ProjectedPoint,
    pub cell_size: CellSize,
    pub extent: GridExtent,
}

impl ProjectionDefinition {
    pub fn new(
        kind: ProjectionKind,
        origin: ProjectedPoint,
        cell_size: CellSize,
        extent: GridExtent,
    ) -> ProjectionResult<Self> {
        if !(cell_size.dx.is_finite() && cell_size.dx > 0.0)
            || !(cell_size.dy.is_finite() && cell_size.dy > 0.0)
        {
            return Err(ProjectionError::InvalidDefinition(format!(
                "cell size must be positive, got {:?}",
                cell_size
            )));
        }
        if extent.rows == 0 || extent.columns == 0 {
            return Err(ProjectionError::InvalidDefinition(format!(
                "grid extent must be non-empty, got {:?}",
                extent
            )));
        }
        if !origin.northing.is_finite() || !origin.easting.is_finite() {
            return Err(ProjectionError::InvalidDefinition(
                "non-finite grid origin".to_string(),
            ));
        }

        Ok(Self {
            kind,
            origin,
            cell_size,
            extent,
        })
    }

    /// Project a geographic point to grid-relative meters.
    pub fn project(&self, lat: f64, lon: f64) -> ProjectionResult<ProjectedPoint> {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ProjectionError::Unprojectable {
                lat,
                lon,
                reason: "coordinate out of range".to_string(),
            });
        }
        let p = self
            .kind
            .forward(lat, lon)
            .ok_or_else(|| ProjectionError::Unprojectable {
                lat,
                lon,
                reason: "no finite image".to_string(),
            })?;
        Ok(ProjectedPoint::new(
            p.northing - self.origin.northing,
            p.easting - self.origin.easting,
        ))
    }

    /// Inverse of [`ProjectionDefinition::project`].
    pub fn unproject(&self, point: ProjectedPoint) -> (f64, f64) {
        self.kind.inverse(ProjectedPoint::new(
            point.northing + self.origin.northing,
            point.easting + self.origin.easting,
        ))
    }

    /// Resolve a geographic point to its grid cell in O(1).
    pub fn locate(&self, lat: f64, lon: f64) -> ProjectionResult<GridIndex> {
        let p = self.project(lat, lon)?;
        Ok(to_index(p.northing, p.easting, self.cell_size, self.extent))
    }

    pub fn locate_point(&self, point: GeoPoint) -> ProjectionResult<GridIndex> {
        self.locate(point.lat, point.lon)
    }

    /// The same projection restricted to a sub-grid starting at `first`.
    pub fn window(&self, first: GridIndex, extent: GridExtent) -> ProjectionResult<Self> {
        if first.row + extent.rows > self.extent.rows
            || first.column + extent.columns > self.extent.columns
        {
            return Err(ProjectionError::InvalidDefinition(format!(
                "window {:?} at {:?} exceeds grid {:?}",
                extent, first, self.extent
            )));
        }
        Self::new(
            self.kind.clone(),
            ProjectedPoint::new(
                self.origin.northing + first.row as f64 * self.cell_size.dy,
                self.origin.easting + first.column as f64 * self.cell_size.dx,
            ),
            self.cell_size,
            extent,
        )
    }

    /// Geographic centre of a grid cell.
    pub fn cell_center(&self, index: GridIndex) -> GeoPoint {
        let (lat, lon) = self.unproject(ProjectedPoint::new(
            index.row as f64 * self.cell_size.dy,
            index.column as f64 * self.cell_size.dx,
        ));
        GeoPoint::new(lat, lon)
    }
}

/// Nearest cell by scanning every cell centre.
///
/// O(rows x columns); kept as the reference that [`ProjectionDefinition::locate`]
/// is checked against.
pub fn nearest_cell_brute_force(definition: &ProjectionDefinition, point: GeoPoint) -> GridIndex {
    let mut best = GridIndex::new(0, 0);
    let mut best_distance = f64::INFINITY;

    for row in 0..definition.extent.rows {
        for column in 0..definition.extent.columns {
            let index = GridIndex::new(row, column);
            let distance = definition.cell_center(index).haversine_distance(&point);
            if distance < best_distance {
                best_distance = distance;
                best = index;
            }
        }
    }

    best
}
