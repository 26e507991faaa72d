//! Current velocity from sampled components.

use serde::{Deserialize, Serialize};

/// Sampled current components in m/s, each possibly missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    /// Eastward component
    pub u: Option<f64>,
    /// Northward component
    pub v: Option<f64>,
    /// Upward component
    pub w: Option<f64>,
}

impl Velocity {
    pub fn new(u: Option<f64>, v: Option<f64>, w: Option<f64>) -> Self {
        Self { u, v, w }
    }

    /// Horizontal speed, missing if either horizontal component is.
    pub fn speed(&self) -> Option<f64> {
        Some(self.u?.hypot(self.v?))
    }

    /// Direction the current flows toward, degrees clockwise from north
    /// in `[0, 360)`. Missing if either horizontal component is.
    pub fn direction_deg(&self) -> Option<f64> {
        Some(direction_degrees(self.u?, self.v?))
    }
}

/// `atan2(u, v)` in degrees clockwise from north, normalised to `[0, 360)`.
pub fn direction_degrees(u: f64, v: f64) -> f64 {
    let degrees = u.atan2(v).to_degrees();
    if degrees < 0.0 {
        degrees + 360.0
    } else {
        degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cardinal_directions() {
        assert!(close(direction_degrees(0.0, 1.0), 0.0));
        assert!(close(direction_degrees(1.0, 0.0), 90.0));
        assert!(close(direction_degrees(0.0, -1.0), 180.0));
        assert!(close(direction_degrees(-1.0, 0.0), 270.0));
    }

    #[test]
    fn test_speed() {
        let v = Velocity::new(Some(0.3), Some(0.4), None);
        assert!(close(v.speed().unwrap(), 0.5));
    }

    #[test]
    fn test_missing_component() {
        let v = Velocity::new(Some(0.3), None, Some(0.01));
        assert_eq!(v.speed(), None);
        assert_eq!(v.direction_deg(), None);
    }
}
