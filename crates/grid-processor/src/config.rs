//! Configuration for the grid sampler.

use serde::{Deserialize, Serialize};

/// Configuration for the grid sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Neighbour radius (in cells) used when a query does not give one.
    pub default_radius: usize,

    /// Upper bound on any requested radius.
    pub max_radius: usize,

    /// Name of the 1-D time axis (seconds since 1970-01-01).
    pub time_axis: String,

    /// Name of the 1-D depth axis (meters, positive down).
    pub depth_axis: String,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            default_radius: 0,
            max_radius: 5,
            time_axis: "time".to_string(),
            depth_axis: "depth".to_string(),
        }
    }
}

impl SamplerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SAMPLER_DEFAULT_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.default_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("SAMPLER_MAX_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.max_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("SAMPLER_TIME_AXIS") {
            config.time_axis = val;
        }

        if let Ok(val) = std::env::var("SAMPLER_DEPTH_AXIS") {
            config.depth_axis = val;
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_radius > self.max_radius {
            return Err(format!(
                "default_radius ({}) must not exceed max_radius ({})",
                self.default_radius, self.max_radius
            ));
        }

        if self.time_axis.is_empty() || self.depth_axis.is_empty() {
            return Err("axis names must not be empty".to_string());
        }

        Ok(())
    }

    /// Clamp a requested radius, falling back to the default.
    pub fn effective_radius(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_radius).min(self.max_radius)
    }
}
