//! Service configuration loaded from YAML.
//!
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax, so endpoints and tokens can be supplied per
//! deployment.

use anyhow::{Context, Result};
use dap_parser::VariableSpec;
use grid_common::WeekPolicy;
use grid_processor::SamplerConfig;
use grid_source::{LookupEndpoints, PeriodTemplate, ProjectedAxes, SourceConfig};
use projection::{
    CellSize, GridExtent, LinearProjection, ProjectedPoint, ProjectionDefinition,
    ProjectionKind, ProjectionResult,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// Root Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub week_policy: WeekPolicy,
    pub ocean: OceanDataset,
    pub lice: LiceDataset,
    pub lookups: LookupEndpoints,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

// ============================================================================
// Datasets
// ============================================================================

/// The ocean model dataset sampled at sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OceanDataset {
    /// Repository key for the dataset and its projection
    pub id: String,
    /// OPeNDAP dataset URL, without the `.ascii`/`.das` suffix
    pub dataset_url: String,
    pub projection: ProjectionSource,
    #[serde(default)]
    pub variables: OceanVariables,
    /// Time step fetched for site conditions
    #[serde(default)]
    pub time_index: usize,
    /// Depth level fetched for site conditions
    #[serde(default)]
    pub depth_index: usize,
    /// Cells fetched on each side of a site's cell
    #[serde(default = "default_window_radius")]
    pub window_radius: usize,
}

fn default_window_radius() -> usize {
    2
}

/// Decoding rules for the ocean fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OceanVariables {
    pub temperature: VariableSpec,
    pub salinity: VariableSpec,
    pub u: VariableSpec,
    pub v: VariableSpec,
    #[serde(default)]
    pub w: Option<VariableSpec>,
    #[serde(default = "default_time_axis")]
    pub time_axis: String,
    #[serde(default = "default_depth_axis")]
    pub depth_axis: String,
}

fn default_time_axis() -> String {
    "time".to_string()
}

fn default_depth_axis() -> String {
    "depth".to_string()
}

impl Default for OceanVariables {
    fn default() -> Self {
        Self {
            temperature: VariableSpec::temperature(),
            salinity: VariableSpec::salinity(),
            u: VariableSpec::velocity("u"),
            v: VariableSpec::velocity("v"),
            w: Some(VariableSpec::velocity("w")),
            time_axis: default_time_axis(),
            depth_axis: default_depth_axis(),
        }
    }
}

impl OceanVariables {
    /// The gridded fields, in request order.
    pub fn fields(&self) -> Vec<&VariableSpec> {
        let mut fields = vec![&self.temperature, &self.salinity, &self.u, &self.v];
        fields.extend(self.w.as_ref());
        fields
    }
}

/// Weekly lice infectious-pressure files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiceDataset {
    pub id: String,
    /// Directory URL the period files live under
    pub base_url: String,
    /// THREDDS catalog listing the period files
    pub catalog_url: String,
    pub file_template: PeriodTemplate,
    pub variable: VariableSpec,
    pub projection: ProjectionSource,
    /// Periods in a site's history
    #[serde(default = "default_history_periods")]
    pub history_periods: usize,
    /// Neighbour radius for lice sampling
    #[serde(default = "default_lice_radius")]
    pub radius: usize,
}

fn default_history_periods() -> usize {
    8
}

fn default_lice_radius() -> usize {
    1
}

// ============================================================================
// Projections
// ============================================================================

/// Where a dataset's grid projection comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionSource {
    /// CF `grid_mapping` attributes plus the projected axes of the dataset
    Metadata {
        /// Variable whose `grid_mapping` attribute names the container
        variable: String,
        #[serde(default = "default_x_axis")]
        x_axis: String,
        #[serde(default = "default_y_axis")]
        y_axis: String,
    },
    /// An axis-aligned linear grid given in configuration
    Linear(LinearGrid),
}

fn default_x_axis() -> String {
    "X".to_string()
}

fn default_y_axis() -> String {
    "Y".to_string()
}

impl ProjectionSource {
    pub fn axes(&self) -> ProjectedAxes {
        match self {
            ProjectionSource::Metadata { x_axis, y_axis, .. } => ProjectedAxes {
                x: x_axis.clone(),
                y: y_axis.clone(),
            },
            ProjectionSource::Linear(_) => ProjectedAxes::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGrid {
    /// Geographic position of the centre of cell (0, 0)
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub lat_deg_per_meter: f64,
    pub lon_deg_per_meter: f64,
    pub cell_size_m: f64,
    pub rows: usize,
    pub columns: usize,
}

impl LinearGrid {
    pub fn definition(&self) -> ProjectionResult<ProjectionDefinition> {
        let kind = ProjectionKind::Linear(LinearProjection::axis_aligned(
            self.lat_deg_per_meter,
            self.lon_deg_per_meter,
            (self.origin_lat, self.origin_lon),
        )?);
        ProjectionDefinition::new(
            kind,
            ProjectedPoint::default(),
            CellSize {
                dx: self.cell_size_m,
                dy: self.cell_size_m,
            },
            GridExtent::new(self.rows, self.columns),
        )
    }
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Environment variable holding the partner API bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "SITE_DATA_API_TOKEN".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load and validate the service configuration.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;

    parse_config(&content)
        .with_context(|| format!("Invalid config in {:?}", path.as_ref()))
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let expanded = expand_env_vars(content)?;

    let config: AppConfig =
        serde_yaml::from_str(&expanded).context("Failed to parse config YAML")?;

    validate_config(&config)?;

    Ok(config)
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{}", after))?;
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_config(config: &AppConfig) -> Result<()> {
    config
        .source
        .validate()
        .map_err(|e| anyhow::anyhow!("source: {}", e))?;
    config
        .sampler
        .validate()
        .map_err(|e| anyhow::anyhow!("sampler: {}", e))?;

    anyhow::ensure!(!config.ocean.id.is_empty(), "ocean.id cannot be empty");
    anyhow::ensure!(
        config.sampler.default_radius <= config.ocean.window_radius,
        "sampler.default_radius ({}) must not exceed ocean.window_radius ({})",
        config.sampler.default_radius,
        config.ocean.window_radius
    );
    anyhow::ensure!(
        !config.ocean.dataset_url.is_empty(),
        "ocean.dataset_url cannot be empty"
    );
    anyhow::ensure!(!config.lice.id.is_empty(), "lice.id cannot be empty");
    anyhow::ensure!(
        config.lice.id != config.ocean.id,
        "lice.id and ocean.id must differ"
    );
    anyhow::ensure!(
        config.lice.history_periods > 0,
        "lice.history_periods must be greater than 0"
    );
    anyhow::ensure!(
        config.week_policy.zero_week_maps_to >= 1 && config.week_policy.zero_week_maps_to <= 53,
        "week_policy.zero_week_maps_to must be a week number (1-53)"
    );

    for projection in [&config.ocean.projection, &config.lice.projection] {
        if let ProjectionSource::Linear(grid) = projection {
            grid.definition()
                .map_err(|e| anyhow::anyhow!("linear projection: {}", e))?;
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
ocean:
  id: norkyst
  dataset_url: http://localhost/thredds/dodsC/norkyst.nc
  projection:
    kind: metadata
    variable: salinity
lice:
  id: lice
  base_url: http://localhost/thredds/dodsC/lice
  catalog_url: http://localhost/thredds/catalog/lice/catalog.xml
  file_template: "lice_{year}_{week:02}.nc"
  variable:
    name: infectious_pressure
    sentinel:
      kind: magnitude_above
      threshold: 1.0e30
    axes: [Y, X]
  projection:
    kind: linear
    origin_lat: 63.0
    origin_lon: 8.0
    lat_deg_per_meter: 1.0e-5
    lon_deg_per_meter: 2.0e-5
    cell_size_m: 1000.0
    rows: 8
    columns: 10
lookups:
  municipality_url: http://localhost/adresser/v1/punktsok
  weather_url: http://localhost/weatherapi/locationforecast/2.0/compact
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.ocean.window_radius, 2);
        assert_eq!(config.ocean.variables.salinity, VariableSpec::salinity());
        assert_eq!(config.ocean.variables.fields().len(), 5);
        assert_eq!(config.lice.history_periods, 8);
        assert_eq!(config.week_policy, WeekPolicy::default());
        assert_eq!(config.source, SourceConfig::default());
        assert!(matches!(
            config.lice.projection,
            ProjectionSource::Linear(LinearGrid { rows: 8, .. })
        ));
        assert_eq!(config.ocean.projection.axes(), ProjectedAxes::default());
    }

    #[test]
    fn test_invalid_template_rejected() {
        let yaml = MINIMAL.replace("lice_{year}_{week:02}.nc", "lice_{year}.nc");
        assert!(parse_config(&yaml).is_err());
    }

    #[test]
    fn test_degenerate_linear_grid_rejected() {
        let yaml = MINIMAL.replace("rows: 8", "rows: 0");
        assert!(parse_config(&yaml).is_err());
    }

    #[test]
    fn test_radius_wider_than_ocean_window_rejected() {
        let yaml = format!("{}sampler:\n  default_radius: 3\n", MINIMAL);
        let err = parse_config(&yaml).unwrap_err();
        assert!(err.to_string().contains("ocean.window_radius"));

        let yaml = format!("{}sampler:\n  default_radius: 2\n", MINIMAL);
        assert_eq!(parse_config(&yaml).unwrap().sampler.default_radius, 2);
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("SITE_DATA_TEST_HOST", "thredds.example");
        let out = expand_env_vars("url: http://${SITE_DATA_TEST_HOST}/x").unwrap();
        assert_eq!(out, "url: http://thredds.example/x");

        std::env::remove_var("SITE_DATA_TEST_UNSET");
        let out = expand_env_vars("${SITE_DATA_TEST_UNSET:-fallback}").unwrap();
        assert_eq!(out, "fallback");

        assert!(expand_env_vars("${SITE_DATA_TEST_UNSET}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }
}
