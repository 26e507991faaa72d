//! Query types for the grid sampler.
//!
//! # Examples
//!
//! ```rust
//! use grid_processor::{SampleQuery, TimeSelection};
//! use chrono::Utc;
//!
//! // Surface value at the first time step, averaging over 1 cell if missing
//! let query = SampleQuery::new().with_radius(1);
//!
//! // Value nearest to now, 10 m down
//! let query = SampleQuery::new().at_time(Utc::now()).at_depth(10.0);
//! assert!(matches!(query.time, TimeSelection::Nearest(_)));
//! ```

use chrono::{DateTime, Utc};
use grid_common::GeoPoint;
use serde::{Deserialize, Serialize};

/// Which time step to read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeSelection {
    /// Explicit index along the time axis
    Index(usize),
    /// Step closest to this instant
    Nearest(DateTime<Utc>),
    /// Last step on the axis
    Latest,
}

impl Default for TimeSelection {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// Which depth level to read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DepthSelection {
    Index(usize),
    /// Level closest to this depth in meters
    Nearest(f64),
}

impl Default for DepthSelection {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// Time, depth and neighbour radius for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleQuery {
    pub time: TimeSelection,
    pub depth: DepthSelection,
    /// `None` uses the sampler's default radius
    pub radius: Option<usize>,
}

impl SampleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_time_index(mut self, index: usize) -> Self {
        self.time = TimeSelection::Index(index);
        self
    }

    pub fn at_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = TimeSelection::Nearest(time);
        self
    }

    pub fn latest(mut self) -> Self {
        self.time = TimeSelection::Latest;
        self
    }

    pub fn at_depth_index(mut self, index: usize) -> Self {
        self.depth = DepthSelection::Index(index);
        self
    }

    pub fn at_depth(mut self, meters: f64) -> Self {
        self.depth = DepthSelection::Nearest(meters);
        self
    }

    /// Neighbour radius for missing cells, capped at `SamplerConfig::max_radius`.
    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// A geographic point with an optional neighbour radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteQuery {
    pub point: GeoPoint,
    pub radius: Option<usize>,
}

impl SiteQuery {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            radius: None,
        }
    }

    /// Neighbour radius for missing cells, capped at `SamplerConfig::max_radius`.
    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = Some(radius);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_query() {
        let query = SampleQuery::new();
        assert_eq!(query.time, TimeSelection::Index(0));
        assert_eq!(query.depth, DepthSelection::Index(0));
        assert_eq!(query.radius, None);
    }

    #[test]
    fn test_builder() {
        let time = Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap();
        let query = SampleQuery::new()
            .at_time(time)
            .at_depth(10.0)
            .with_radius(2);
        assert_eq!(query.time, TimeSelection::Nearest(time));
        assert_eq!(query.depth, DepthSelection::Nearest(10.0));
        assert_eq!(query.radius, Some(2));
    }
}
