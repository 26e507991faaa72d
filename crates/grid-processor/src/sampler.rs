//! Point sampling with a neighbour-average fallback.
//!
//! Ocean model grids are sparse near the coast: land cells and cells below
//! the sea floor are missing. A fish farm usually sits a cell or two from
//! the nearest valid ocean cell, so when the addressed cell is missing the
//! sampler averages every valid cell in the inclusive square window of
//! `radius` cells around it.
//!
//! Variables are addressed by rank:
//!
//! | rank | axes                        |
//! |------|-----------------------------|
//! | 4    | time, depth, row, column    |
//! | 3    | time, row, column           |
//! | 2    | row, column                 |

use chrono::{DateTime, Utc};
use dap_parser::GridDataset;
use grid_common::{GeoPoint, GridError, GridResult, NdArray};
use projection::{GridIndex, ProjectionDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::SamplerConfig;
use crate::query::{DepthSelection, SampleQuery, SiteQuery, TimeSelection};
use crate::velocity::Velocity;

/// Position of a cell on all four axes. Axes a variable lacks are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub time: usize,
    pub depth: usize,
    pub row: usize,
    pub column: usize,
}

impl CellAddress {
    pub fn new(time: usize, depth: usize, row: usize, column: usize) -> Self {
        Self {
            time,
            depth,
            row,
            column,
        }
    }

    /// First time step and depth level at a grid position.
    pub fn at(index: GridIndex) -> Self {
        Self::new(0, 0, index.row, index.column)
    }

    fn with_cell(self, row: usize, column: usize) -> Self {
        Self {
            row,
            column,
            ..self
        }
    }

    /// Full index tuple for an array of the given rank.
    fn index_for_rank(&self, rank: usize) -> Option<Vec<usize>> {
        match rank {
            4 => Some(vec![self.time, self.depth, self.row, self.column]),
            3 => Some(vec![self.time, self.row, self.column]),
            2 => Some(vec![self.row, self.column]),
            _ => None,
        }
    }
}

/// Names of the velocity component variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityComponents {
    pub u: String,
    pub v: String,
    /// Vertical component, if the dataset has one
    #[serde(default)]
    pub w: Option<String>,
}

impl Default for VelocityComponents {
    fn default() -> Self {
        Self {
            u: "u".to_string(),
            v: "v".to_string(),
            w: Some("w".to_string()),
        }
    }
}

/// Samples values out of one parsed dataset.
///
/// Cheap to clone; the dataset and projection are shared read-only.
#[derive(Debug, Clone)]
pub struct GridSampler {
    dataset: Arc<GridDataset>,
    projection: Option<Arc<ProjectionDefinition>>,
    config: SamplerConfig,
}

impl GridSampler {
    pub fn new(
        dataset: Arc<GridDataset>,
        projection: Option<Arc<ProjectionDefinition>>,
        config: SamplerConfig,
    ) -> Self {
        Self {
            dataset,
            projection,
            config,
        }
    }

    pub fn dataset(&self) -> &GridDataset {
        &self.dataset
    }

    pub fn projection(&self) -> Option<&ProjectionDefinition> {
        self.projection.as_deref()
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    fn array(&self, variable: &str) -> GridResult<&NdArray<f64>> {
        self.dataset
            .array(variable)
            .ok_or_else(|| GridError::missing(format!("variable '{}' not in dataset", variable)))
    }

    /// Resolve a geographic point to its grid cell.
    pub fn locate(&self, point: GeoPoint) -> GridResult<GridIndex> {
        let projection = self.projection.as_ref().ok_or_else(|| {
            GridError::unresolved("dataset has no projection definition".to_string())
        })?;
        Ok(projection.locate_point(point)?)
    }

    /// Value at an absolute cell address.
    ///
    /// A present cell is returned as-is. A missing cell with `radius > 0`
    /// yields the mean of the valid cells in the window, or `None` when the
    /// whole window is missing. The radius is capped at
    /// `SamplerConfig::max_radius`.
    pub fn sample_index(
        &self,
        variable: &str,
        address: CellAddress,
        radius: usize,
    ) -> GridResult<Option<f64>> {
        let array = self.array(variable)?;
        let shape = array.shape();
        let rank = shape.len();
        let index = address.index_for_rank(rank).ok_or_else(|| {
            GridError::DimensionMismatch(format!(
                "variable '{}' has rank {}, expected 2 to 4",
                variable, rank
            ))
        })?;

        let axes: &[&str] = match rank {
            4 => &["time", "depth", "row", "column"],
            3 => &["time", "row", "column"],
            _ => &["row", "column"],
        };
        for ((axis, &requested), &extent) in axes.iter().zip(&index).zip(shape) {
            if requested >= extent {
                return Err(GridError::OutOfBounds {
                    axis: axis.to_string(),
                    requested,
                    extent,
                });
            }
        }

        if let Some(value) = array.get(&index) {
            return Ok(Some(value));
        }

        if radius > self.config.max_radius {
            debug!(
                variable,
                requested = radius,
                max_radius = self.config.max_radius,
                "Radius capped"
            );
        }
        let radius = radius.min(self.config.max_radius);
        if radius == 0 {
            return Ok(None);
        }

        let rows = shape[rank - 2];
        let columns = shape[rank - 1];
        let mut sum = 0.0;
        let mut count = 0usize;
        for row in address.row.saturating_sub(radius)..=(address.row + radius).min(rows - 1) {
            for column in
                address.column.saturating_sub(radius)..=(address.column + radius).min(columns - 1)
            {
                let neighbour = address.with_cell(row, column).index_for_rank(rank);
                if let Some(value) = neighbour.and_then(|i| array.get(&i)) {
                    sum += value;
                    count += 1;
                }
            }
        }

        debug!(
            variable,
            row = address.row,
            column = address.column,
            radius,
            neighbours = count,
            "Cell missing, averaged neighbours"
        );

        Ok((count > 0).then(|| sum / count as f64))
    }

    /// Time index for a selection, checked against the variable's time axis.
    pub fn resolve_time(&self, variable: &str, selection: TimeSelection) -> GridResult<usize> {
        let array = self.array(variable)?;
        if array.rank() < 3 {
            return Ok(0);
        }
        let extent = array.shape()[0];

        match selection {
            TimeSelection::Index(index) if index < extent => Ok(index),
            TimeSelection::Index(index) => Err(GridError::OutOfBounds {
                axis: self.config.time_axis.clone(),
                requested: index,
                extent,
            }),
            TimeSelection::Latest => Ok(extent - 1),
            TimeSelection::Nearest(instant) => {
                let seconds = instant.timestamp() as f64;
                self.nearest_on_axis(&self.config.time_axis, seconds, extent)
            }
        }
    }

    /// Depth index for a selection; 0 for variables without a depth axis.
    pub fn resolve_depth(&self, variable: &str, selection: DepthSelection) -> GridResult<usize> {
        let array = self.array(variable)?;
        if array.rank() < 4 {
            return Ok(0);
        }
        let extent = array.shape()[1];

        match selection {
            DepthSelection::Index(index) if index < extent => Ok(index),
            DepthSelection::Index(index) => Err(GridError::OutOfBounds {
                axis: self.config.depth_axis.clone(),
                requested: index,
                extent,
            }),
            DepthSelection::Nearest(meters) => {
                self.nearest_on_axis(&self.config.depth_axis, meters, extent)
            }
        }
    }

    fn nearest_on_axis(&self, axis: &str, target: f64, extent: usize) -> GridResult<usize> {
        let values = self
            .dataset
            .axis_values(axis)
            .ok_or_else(|| GridError::missing(format!("axis '{}' not in dataset", axis)))?;
        if values.len() != extent {
            return Err(GridError::DimensionMismatch(format!(
                "axis '{}' has {} values, variable expects {}",
                axis,
                values.len(),
                extent
            )));
        }

        values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, (v - target).abs())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .ok_or_else(|| GridError::missing(format!("axis '{}' has no values", axis)))
    }

    /// Full address for a grid position under a query.
    pub fn resolve_address(
        &self,
        variable: &str,
        index: GridIndex,
        query: &SampleQuery,
    ) -> GridResult<CellAddress> {
        Ok(CellAddress::new(
            self.resolve_time(variable, query.time)?,
            self.resolve_depth(variable, query.depth)?,
            index.row,
            index.column,
        ))
    }

    /// Value at a geographic site.
    ///
    /// The site's radius wins over the query's, which wins over the
    /// configured default.
    pub fn sample_site(
        &self,
        variable: &str,
        site: &SiteQuery,
        query: &SampleQuery,
    ) -> GridResult<Option<f64>> {
        let index = self.locate(site.point)?;
        let address = self.resolve_address(variable, index, query)?;
        let radius = self.config.effective_radius(site.radius.or(query.radius));
        self.sample_index(variable, address, radius)
    }

    /// Velocity components at a site, each sampled independently.
    pub fn sample_velocity(
        &self,
        components: &VelocityComponents,
        site: &SiteQuery,
        query: &SampleQuery,
    ) -> GridResult<Velocity> {
        let w = match &components.w {
            Some(name) if self.dataset.contains(name) => self.sample_site(name, site, query)?,
            _ => None,
        };
        Ok(Velocity::new(
            self.sample_site(&components.u, site, query)?,
            self.sample_site(&components.v, site, query)?,
            w,
        ))
    }

    /// Instant of a time index, from the time axis.
    pub fn time_at(&self, index: usize) -> Option<DateTime<Utc>> {
        let seconds = self.dataset.axis_values(&self.config.time_axis)?.get(index).copied()??;
        DateTime::from_timestamp(seconds.round() as i64, 0)
    }

    /// Depth in meters of a depth index, from the depth axis.
    pub fn depth_at(&self, index: usize) -> Option<f64> {
        self.dataset
            .axis_values(&self.config.depth_axis)?
            .get(index)
            .copied()?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dap_parser::Variable;

    fn sampler(values: Vec<Option<f64>>, shape: Vec<usize>, axes: &[&str]) -> GridSampler {
        let dataset = GridDataset::new(vec![Variable {
            name: "t".to_string(),
            axes: axes.iter().map(|s| s.to_string()).collect(),
            array: NdArray::from_flat(shape, values).unwrap(),
        }])
        .unwrap();
        GridSampler::new(Arc::new(dataset), None, SamplerConfig::default())
    }

    #[test]
    fn test_present_cell_ignores_radius() {
        let s = sampler(
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            vec![2, 2],
            &["Y", "X"],
        );
        assert_eq!(s.sample_index("t", CellAddress::new(0, 0, 1, 0), 1).unwrap(), Some(3.0));
    }

    #[test]
    fn test_window_clipped_at_edges() {
        // Missing corner, valid neighbours 2, 4 and 6
        let s = sampler(
            vec![None, Some(2.0), Some(4.0), Some(6.0)],
            vec![2, 2],
            &["Y", "X"],
        );
        assert_eq!(s.sample_index("t", CellAddress::default(), 1).unwrap(), Some(4.0));
    }

    #[test]
    fn test_radius_above_max_is_capped() {
        // Centre missing; ring at distance 1 is 1.0, ring at distance 2 is 100.0
        let mut values = vec![Some(100.0); 25];
        for row in 1..4 {
            for column in 1..4 {
                values[row * 5 + column] = Some(1.0);
            }
        }
        values[12] = None;
        let dataset = GridDataset::new(vec![Variable {
            name: "t".to_string(),
            axes: vec!["Y".to_string(), "X".to_string()],
            array: NdArray::from_flat(vec![5, 5], values).unwrap(),
        }])
        .unwrap();
        let config = SamplerConfig {
            max_radius: 1,
            ..SamplerConfig::default()
        };
        let s = GridSampler::new(Arc::new(dataset), None, config);

        let address = CellAddress::new(0, 0, 2, 2);
        assert_eq!(s.sample_index("t", address, 5).unwrap(), Some(1.0));
        assert_eq!(
            s.sample_index("t", address, 5).unwrap(),
            s.sample_index("t", address, 1).unwrap()
        );
    }

    #[test]
    fn test_rank_three_addressing() {
        let s = sampler(
            (0..8).map(|v| Some(v as f64)).collect(),
            vec![2, 2, 2],
            &["time", "Y", "X"],
        );
        assert_eq!(s.sample_index("t", CellAddress::new(1, 7, 0, 1), 0).unwrap(), Some(5.0));
    }

    #[test]
    fn test_out_of_bounds_address() {
        let s = sampler(vec![Some(1.0); 4], vec![2, 2], &["Y", "X"]);
        let err = s.sample_index("t", CellAddress::new(0, 0, 2, 0), 0).unwrap_err();
        assert!(matches!(err, GridError::OutOfBounds { ref axis, requested: 2, extent: 2 } if axis == "row"));
    }

    #[test]
    fn test_unknown_variable() {
        let s = sampler(vec![Some(1.0); 4], vec![2, 2], &["Y", "X"]);
        assert!(matches!(
            s.sample_index("salinity", CellAddress::default(), 0),
            Err(GridError::MissingData(_))
        ));
    }

    #[test]
    fn test_locate_without_projection() {
        let s = sampler(vec![Some(1.0); 4], vec![2, 2], &["Y", "X"]);
        let err = s.locate(GeoPoint::new(63.0, 8.0)).unwrap_err();
        assert!(matches!(err, GridError::UnresolvedLocation(_)));
    }

    #[test]
    fn test_one_dimensional_variable_rejected() {
        let s = sampler(vec![Some(1.0); 3], vec![3], &["time"]);
        assert!(matches!(
            s.sample_index("t", CellAddress::default(), 0),
            Err(GridError::DimensionMismatch(_))
        ));
    }
}
