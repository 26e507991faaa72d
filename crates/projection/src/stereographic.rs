//! Polar Stereographic projection (ellipsoidal, polar aspect).
//!
//! Ocean models along the Norwegian coast (NorKyst-800 and relatives) are
//! delivered on a polar stereographic grid. The projection maps the
//! ellipsoid onto a plane tangent at (or secant through) the pole.
//!
//! The projection parameters match the CF `polar_stereographic` grid
//! mapping attributes:
//! - `straight_vertical_longitude_from_pole`: central meridian
//! - `latitude_of_projection_origin`: +90 (north) or -90 (south)
//! - `standard_parallel`: latitude of true scale (optional)
//! - `scale_factor_at_projection_origin`: used when no standard parallel is given
//! - `false_easting` / `false_northing`: offsets in meters
//!
//! Formulas follow Snyder, "Map Projections: A Working Manual" (1987),
//! equations 15-9, 21-33 to 21-40. The south polar aspect is computed by
//! mirroring latitude and longitude through the north polar formulas.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::definition::{MapProjection, ProjectedPoint};
use crate::error::{ProjectionError, ProjectionResult};

/// Reference ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Semi-major axis (meters)
    pub semi_major_axis: f64,
    /// Inverse flattening (0 for a sphere)
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub fn wgs84() -> Self {
        Self {
            semi_major_axis: 6_378_137.0,
            inverse_flattening: 298.257_223_563,
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Self {
            semi_major_axis: radius,
            inverse_flattening: 0.0,
        }
    }

    /// Build from semi-major and semi-minor axes.
    pub fn from_axes(semi_major_axis: f64, semi_minor_axis: f64) -> Self {
        let flattening = (semi_major_axis - semi_minor_axis) / semi_major_axis;
        Self {
            semi_major_axis,
            inverse_flattening: if flattening.abs() < 1e-15 {
                0.0
            } else {
                1.0 / flattening
            },
        }
    }

    /// First eccentricity.
    pub fn eccentricity(&self) -> f64 {
        if self.inverse_flattening == 0.0 {
            return 0.0;
        }
        let f = 1.0 / self.inverse_flattening;
        (f * (2.0 - f)).sqrt()
    }
}

/// Polar Stereographic projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarStereographic {
    pub ellipsoid: Ellipsoid,
    /// Central meridian in radians
    pub lon0: f64,
    /// True for the north polar aspect
    pub north: bool,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Eccentricity
    e: f64,
    /// rho = rho_factor * t(phi)
    rho_factor: f64,
}

impl PolarStereographic {
    /// Create a polar stereographic projection.
    ///
    /// # Arguments
    /// * `ellipsoid` - Reference ellipsoid
    /// * `latitude_of_origin_deg` - +90 or -90
    /// * `central_meridian_deg` - Straight vertical longitude from pole
    /// * `standard_parallel_deg` - Latitude of true scale, if any
    /// * `scale_factor` - Scale at the pole (ignored when a standard parallel is given)
    /// * `false_easting`, `false_northing` - Offsets in meters
    pub fn new(
        ellipsoid: Ellipsoid,
        latitude_of_origin_deg: f64,
        central_meridian_deg: f64,
        standard_parallel_deg: Option<f64>,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> ProjectionResult<Self> {
        let north = if (latitude_of_origin_deg - 90.0).abs() < 1e-9 {
            true
        } else if (latitude_of_origin_deg + 90.0).abs() < 1e-9 {
            false
        } else {
            return Err(ProjectionError::InvalidDefinition(format!(
                "latitude_of_projection_origin must be +/-90, got {}",
                latitude_of_origin_deg
            )));
        };

        let a = ellipsoid.semi_major_axis;
        if !(a.is_finite() && a > 0.0) {
            return Err(ProjectionError::InvalidDefinition(format!(
                "semi-major axis must be positive, got {}",
                a
            )));
        }
        let e = ellipsoid.eccentricity();
        if !(0.0..1.0).contains(&e) {
            return Err(ProjectionError::InvalidDefinition(format!(
                "eccentricity out of range: {}",
                e
            )));
        }
        if !central_meridian_deg.is_finite()
            || !false_easting.is_finite()
            || !false_northing.is_finite()
        {
            return Err(ProjectionError::InvalidDefinition(
                "non-finite projection parameter".to_string(),
            ));
        }

        let sign = if north { 1.0 } else { -1.0 };
        let rho_factor = match standard_parallel_deg {
            Some(lat_ts_deg) if (lat_ts_deg.abs() - 90.0).abs() > 1e-9 => {
                if lat_ts_deg * sign <= 0.0 || lat_ts_deg.abs() > 90.0 {
                    return Err(ProjectionError::InvalidDefinition(format!(
                        "standard parallel {} not in the projection hemisphere",
                        lat_ts_deg
                    )));
                }
                let lat_ts = (sign * lat_ts_deg).to_radians();
                a * m(lat_ts, e) / t(lat_ts, e)
            }
            _ => {
                if !(scale_factor.is_finite() && scale_factor > 0.0) {
                    return Err(ProjectionError::InvalidDefinition(format!(
                        "scale factor must be positive, got {}",
                        scale_factor
                    )));
                }
                2.0 * a * scale_factor
                    / ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt()
            }
        };

        Ok(Self {
            ellipsoid,
            lon0: central_meridian_deg.to_radians(),
            north,
            false_easting,
            false_northing,
            e,
            rho_factor,
        })
    }

    /// NorKyst-800 coastal model projection
    /// (`+proj=stere +ellps=WGS84 +lat_0=90 +lat_ts=60 +lon_0=70 +x_0=3192800 +y_0=1784000`).
    pub fn norkyst800() -> Self {
        Self {
            ellipsoid: Ellipsoid::wgs84(),
            lon0: 70.0_f64.to_radians(),
            north: true,
            false_easting: 3_192_800.0,
            false_northing: 1_784_000.0,
            e: Ellipsoid::wgs84().eccentricity(),
            rho_factor: {
                let e = Ellipsoid::wgs84().eccentricity();
                let lat_ts = 60.0_f64.to_radians();
                Ellipsoid::wgs84().semi_major_axis * m(lat_ts, e) / t(lat_ts, e)
            },
        }
    }

    fn sign(&self) -> f64 {
        if self.north {
            1.0
        } else {
            -1.0
        }
    }
}

impl MapProjection for PolarStereographic {
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> Option<ProjectedPoint> {
        let sign = self.sign();
        let phi = sign * lat_deg.to_radians();

        // The opposite pole maps to infinity
        if phi <= -FRAC_PI_2 + 1e-10 {
            return None;
        }

        let dlon = sign * normalize_angle(lon_deg.to_radians() - self.lon0);
        let rho = self.rho_factor * t(phi, self.e);

        Some(ProjectedPoint {
            easting: sign * rho * dlon.sin() + self.false_easting,
            northing: -sign * rho * dlon.cos() + self.false_northing,
        })
    }

    fn inverse(&self, point: ProjectedPoint) -> (f64, f64) {
        let sign = self.sign();
        let x = sign * (point.easting - self.false_easting);
        let y = sign * (point.northing - self.false_northing);

        let rho = x.hypot(y);
        let t = rho / self.rho_factor;

        // Iterate Snyder 7-9 for the conformal latitude
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        if self.e > 0.0 {
            for _ in 0..15 {
                let es = self.e * phi.sin();
                let next =
                    FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
                let converged = (next - phi).abs() < 1e-12;
                phi = next;
                if converged {
                    break;
                }
            }
        }

        let lambda = if rho == 0.0 { 0.0 } else { x.atan2(-y) };
        let lat = sign * phi;
        let lon = normalize_angle(self.lon0 + sign * lambda);

        (lat.to_degrees(), lon.to_degrees())
    }
}

/// Snyder 15-9.
fn t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Snyder 14-15.
fn m(phi: f64, e: f64) -> f64 {
    phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
}

/// Normalize an angle to [-π, π].
fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}
