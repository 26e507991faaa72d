//! Per-variable decoding rules: sentinel detection and linear scaling.
//!
//! The legacy ASCII format does not carry `scale_factor`/`add_offset`, so
//! the rules are fixed per variable ahead of time. They are plain data
//! (serde) so that a dataset definition can override them if the upstream
//! schema changes.

use serde::{Deserialize, Serialize};

/// Raw value assigned to missing cells in the NorKyst integer fields.
pub const INT16_FILL: f64 = -32767.0;

/// Anything above this magnitude is a floating point fill value
/// (NetCDF default fill is 9.96921e36).
pub const FLOAT_FILL_THRESHOLD: f64 = 1e30;

/// Rule deciding which raw values mean "no observation".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SentinelPolicy {
    /// Only NaN is missing
    #[default]
    None,
    /// A specific raw value
    Equals { value: f64 },
    /// Any value whose magnitude exceeds the threshold
    MagnitudeAbove { threshold: f64 },
    /// Missing if any rule matches
    AnyOf { rules: Vec<SentinelPolicy> },
}

impl SentinelPolicy {
    pub fn is_missing(&self, raw: f64) -> bool {
        if raw.is_nan() {
            return true;
        }
        match self {
            SentinelPolicy::None => false,
            SentinelPolicy::Equals { value } => {
                (raw - value).abs() <= 1e-6 * value.abs().max(1.0)
            }
            SentinelPolicy::MagnitudeAbove { threshold } => raw.abs() > *threshold,
            SentinelPolicy::AnyOf { rules } => rules.iter().any(|r| r.is_missing(raw)),
        }
    }
}

/// How one variable is located and decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Variable name as it appears in the response
    pub name: String,

    /// Multiplier applied to raw values
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Subtracted after scaling: `raw * scale - offset`
    #[serde(default)]
    pub offset: f64,

    #[serde(default)]
    pub sentinel: SentinelPolicy,

    /// Axis names, used when the response has no DDS block
    #[serde(default)]
    pub axes: Vec<String>,
}

fn default_scale() -> f64 {
    1.0
}

/// Axis names of the 4-D ocean model fields.
pub const OCEAN_AXES: [&str; 4] = ["time", "depth", "Y", "X"];

impl VariableSpec {
    /// Identity decoding, no sentinel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale: default_scale(),
            offset: 0.0,
            sentinel: SentinelPolicy::None,
            axes: Vec::new(),
        }
    }

    pub fn with_scale(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn with_sentinel(mut self, sentinel: SentinelPolicy) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn with_axes<I, S>(mut self, axes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.axes = axes.into_iter().map(Into::into).collect();
        self
    }

    /// Decode one raw value.
    pub fn decode(&self, raw: f64) -> Option<f64> {
        if self.sentinel.is_missing(raw) {
            None
        } else {
            Some(raw * self.scale - self.offset)
        }
    }

    /// Sea temperature in °C (raw hundredths around 10 °C).
    pub fn temperature() -> Self {
        Self::new("temperature")
            .with_scale(0.01, -10.0)
            .with_sentinel(SentinelPolicy::Equals { value: INT16_FILL })
            .with_axes(OCEAN_AXES)
    }

    /// Salinity in PSU (raw thousandths around 30).
    pub fn salinity() -> Self {
        Self::new("salinity")
            .with_scale(0.001, -30.0)
            .with_sentinel(SentinelPolicy::Equals { value: INT16_FILL })
            .with_axes(OCEAN_AXES)
    }

    /// A current velocity component (`u`, `v` or `w`) in m/s.
    pub fn velocity(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_scale(0.001, 0.0)
            .with_sentinel(SentinelPolicy::Equals { value: INT16_FILL })
            .with_axes(OCEAN_AXES)
    }

    /// Sea-lice infectious pressure on a (Y, X) grid.
    pub fn infectious_pressure(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_sentinel(SentinelPolicy::MagnitudeAbove {
                threshold: FLOAT_FILL_THRESHOLD,
            })
            .with_axes(["Y", "X"])
    }

    /// A 1-D coordinate axis, decoded as-is.
    pub fn axis(name: &str) -> Self {
        Self::new(name).with_axes([name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salinity_decoding() {
        let spec = VariableSpec::salinity();
        let value = spec.decode(5085.0).unwrap();
        assert!((value - 35.085).abs() < 1e-9);
        assert_eq!(spec.decode(-32767.0), None);
    }

    #[test]
    fn test_zero_is_not_missing() {
        let spec = VariableSpec::velocity("u");
        assert_eq!(spec.decode(0.0), Some(0.0));
    }

    #[test]
    fn test_magnitude_sentinel() {
        let spec = VariableSpec::infectious_pressure("ip");
        assert_eq!(spec.decode(9.96921e36), None);
        assert_eq!(spec.decode(-9.96921e36), None);
        assert_eq!(spec.decode(0.25), Some(0.25));
    }

    #[test]
    fn test_nan_is_always_missing() {
        assert!(SentinelPolicy::None.is_missing(f64::NAN));
        assert_eq!(VariableSpec::new("x").decode(f64::NAN), None);
    }

    #[test]
    fn test_any_of() {
        let policy = SentinelPolicy::AnyOf {
            rules: vec![
                SentinelPolicy::Equals { value: -999.0 },
                SentinelPolicy::MagnitudeAbove { threshold: 1e6 },
            ],
        };
        assert!(policy.is_missing(-999.0));
        assert!(policy.is_missing(5e7));
        assert!(!policy.is_missing(12.0));
    }
}
