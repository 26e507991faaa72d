//! Immutable results handed to callers.

use chrono::{DateTime, Utc};
use grid_common::{GeoPoint, Period, SiteId};
use grid_processor::Velocity;
use projection::GridIndex;
use serde::Serialize;

/// Ocean conditions at a site for one time step and depth level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteConditions {
    pub site: SiteId,
    pub location: GeoPoint,
    /// Cell of the full model grid the site resolves to
    pub cell: GridIndex,
    pub time: Option<DateTime<Utc>>,
    /// Meters below the surface
    pub depth: Option<f64>,
    /// °C
    pub temperature: Option<f64>,
    /// PSU
    pub salinity: Option<f64>,
    pub velocity: Velocity,
    /// Horizontal speed in m/s
    pub speed: Option<f64>,
    /// Flow direction, degrees clockwise from north
    pub direction_deg: Option<f64>,
}

impl SiteConditions {
    /// Whether any field was sampled.
    pub fn has_data(&self) -> bool {
        self.temperature.is_some()
            || self.salinity.is_some()
            || self.velocity.u.is_some()
            || self.velocity.v.is_some()
            || self.velocity.w.is_some()
    }
}

/// Lice infectious pressure at a site for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LicePressurePoint {
    pub period: Period,
    pub value: f64,
}

/// Summary of a loaded grid, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub variable: String,
    pub shape: Vec<usize>,
    pub cells: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}
