//! Site and location keys used by the repositories.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GridError, GridResult};

/// A geographic point in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject non-finite coordinates and latitudes outside [-90, 90].
    pub fn validated(lat: f64, lon: f64) -> GridResult<Self> {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GridError::unresolved(format!(
                "invalid coordinate ({}, {})",
                lat, lon
            )));
        }
        Ok(Self::new(lat, lon))
    }

    /// Great-circle distance in meters (spherical earth).
    pub fn haversine_distance(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// Identifier of a fish-farming site (locality number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fish-farming site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    #[serde(default)]
    pub name: String,
    pub location: GeoPoint,
}

impl Site {
    pub fn new(id: u32, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: SiteId(id),
            name: name.into(),
            location: GeoPoint::new(lat, lon),
        }
    }
}

/// Four-digit Norwegian municipality code, kept as text (leading zeros matter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MunicipalityCode(pub String);

impl fmt::Display for MunicipalityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashable cache key for a coordinate, quantised to 1e-5 degrees (~1 m).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat_e5: i64,
    lon_e5: i64,
}

impl CoordinateKey {
    const SCALE: f64 = 100_000.0;

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat_e5 as f64 / Self::SCALE, self.lon_e5 as f64 / Self::SCALE)
    }
}

impl From<GeoPoint> for CoordinateKey {
    fn from(point: GeoPoint) -> Self {
        Self {
            lat_e5: (point.lat * Self::SCALE).round() as i64,
            lon_e5: (point.lon * Self::SCALE).round() as i64,
        }
    }
}
