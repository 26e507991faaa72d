//! Integration tests for grid sampling over parsed responses.

use chrono::{TimeZone, Utc};
use dap_parser::{parse_dataset, GridDataset, VariableSpec};
use grid_common::{GeoPoint, GridError};
use grid_processor::{
    CellAddress, GridSampler, SampleQuery, SamplerConfig, SiteQuery, VelocityComponents,
};
use projection::{
    CellSize, GridExtent, LinearProjection, ProjectedPoint, ProjectionDefinition, ProjectionKind,
};
use std::sync::Arc;
use test_utils::{
    assert_approx_eq, index_encoded_values, linear_grid, salinity_scenario_response,
    AsciiResponse,
};

fn scenario_sampler() -> GridSampler {
    let body = salinity_scenario_response();
    let dataset = parse_dataset(
        &body,
        &[
            VariableSpec::salinity(),
            VariableSpec::axis("time"),
            VariableSpec::axis("depth"),
        ],
    )
    .unwrap();
    GridSampler::new(Arc::new(dataset), None, SamplerConfig::default())
}

fn linear_definition() -> Arc<ProjectionDefinition> {
    let kind = ProjectionKind::Linear(
        LinearProjection::axis_aligned(
            linear_grid::DEG_PER_METER_LAT,
            linear_grid::DEG_PER_METER_LON,
            (linear_grid::ORIGIN_LAT, linear_grid::ORIGIN_LON),
        )
        .unwrap(),
    );
    Arc::new(
        ProjectionDefinition::new(
            kind,
            ProjectedPoint::default(),
            CellSize {
                dx: linear_grid::CELL_SIZE,
                dy: linear_grid::CELL_SIZE,
            },
            GridExtent::new(linear_grid::ROWS, linear_grid::COLUMNS),
        )
        .unwrap(),
    )
}

fn linear_dataset(names: &[&str]) -> GridDataset {
    let shape = [("Y", linear_grid::ROWS), ("X", linear_grid::COLUMNS)];
    let values = index_encoded_values(&[linear_grid::ROWS, linear_grid::COLUMNS]);
    let mut response = AsciiResponse::new("linear.nc");
    for name in names {
        response = response.grid(name, "Float32", &shape, &values);
    }
    let specs: Vec<VariableSpec> = names.iter().map(|n| VariableSpec::new(*n)).collect();
    parse_dataset(&response.render(), &specs).unwrap()
}

// ============================================================================
// Salinity scenario
// ============================================================================

#[test]
fn test_scenario_radius_one_returns_scaled_neighbour_mean() {
    let sampler = scenario_sampler();
    let value = sampler
        .sample_index("salinity", CellAddress::new(0, 0, 0, 0), 1)
        .unwrap()
        .unwrap();
    assert_approx_eq!(value, 35.085, 1e-9);
}

#[test]
fn test_scenario_radius_zero_on_sentinel_is_no_data() {
    let sampler = scenario_sampler();
    assert_eq!(
        sampler
            .sample_index("salinity", CellAddress::new(0, 0, 0, 0), 0)
            .unwrap(),
        None
    );
}

#[test]
fn test_scenario_other_time_steps_untouched() {
    let sampler = scenario_sampler();
    // Flat index 12 is [1][0][0][0]: raw 5112
    let value = sampler
        .sample_index("salinity", CellAddress::new(1, 0, 0, 0), 1)
        .unwrap()
        .unwrap();
    assert_approx_eq!(value, 35.112, 1e-9);
}

#[test]
fn test_all_neighbours_missing_is_no_data() {
    let body = "v.v[2][2]\n[0], -32767, -32767\n[1], -32767, -32767\n";
    let spec = VariableSpec::new("v")
        .with_sentinel(dap_parser::SentinelPolicy::Equals { value: -32767.0 })
        .with_axes(["Y", "X"]);
    let dataset = parse_dataset(body, &[spec]).unwrap();
    let sampler = GridSampler::new(Arc::new(dataset), None, SamplerConfig::default());
    assert_eq!(
        sampler.sample_index("v", CellAddress::new(0, 0, 1, 1), 3).unwrap(),
        None
    );
}

// ============================================================================
// Time and depth resolution
// ============================================================================

#[test]
fn test_nearest_time_and_depth() {
    let sampler = scenario_sampler();
    let instant = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
    let query = SampleQuery::new().at_time(instant).at_depth(7.0);

    assert_eq!(sampler.resolve_time("salinity", query.time).unwrap(), 1);
    assert_eq!(sampler.resolve_depth("salinity", query.depth).unwrap(), 1);
    assert_eq!(
        sampler.resolve_time("salinity", SampleQuery::new().latest().time).unwrap(),
        2
    );
    assert_eq!(sampler.depth_at(1), Some(10.0));
    assert_eq!(
        sampler.time_at(0),
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_time_index_out_of_bounds() {
    let sampler = scenario_sampler();
    let err = sampler
        .resolve_time("salinity", SampleQuery::new().at_time_index(3).time)
        .unwrap_err();
    assert!(matches!(
        err,
        GridError::OutOfBounds { requested: 3, extent: 3, .. }
    ));
}

// ============================================================================
// Site queries
// ============================================================================

#[test]
fn test_site_resolves_to_its_cell() {
    let sampler = GridSampler::new(
        Arc::new(linear_dataset(&["temperature"])),
        Some(linear_definition()),
        SamplerConfig::default(),
    );
    let (lat, lon) = linear_grid::cell_center(3, 4);
    let site = SiteQuery::new(GeoPoint::new(lat, lon));

    let value = sampler
        .sample_site("temperature", &site, &SampleQuery::new())
        .unwrap();
    assert_eq!(value, Some(34.0));
}

#[test]
fn test_site_outside_grid_is_clamped() {
    let sampler = GridSampler::new(
        Arc::new(linear_dataset(&["temperature"])),
        Some(linear_definition()),
        SamplerConfig::default(),
    );
    let site = SiteQuery::new(GeoPoint::new(70.0, 30.0));
    let value = sampler
        .sample_site("temperature", &site, &SampleQuery::new())
        .unwrap();
    assert_eq!(value, Some(79.0));
}

#[test]
fn test_site_without_projection_is_unresolved() {
    let sampler = GridSampler::new(
        Arc::new(linear_dataset(&["temperature"])),
        None,
        SamplerConfig::default(),
    );
    let site = SiteQuery::new(GeoPoint::new(63.03, 8.08));
    let err = sampler
        .sample_site("temperature", &site, &SampleQuery::new())
        .unwrap_err();
    assert!(matches!(err, GridError::UnresolvedLocation(_)));
}

#[test]
fn test_velocity_at_site() {
    let sampler = GridSampler::new(
        Arc::new(linear_dataset(&["u", "v"])),
        Some(linear_definition()),
        SamplerConfig::default(),
    );
    let (lat, lon) = linear_grid::cell_center(1, 1);
    let site = SiteQuery::new(GeoPoint::new(lat, lon));

    let velocity = sampler
        .sample_velocity(&VelocityComponents::default(), &site, &SampleQuery::new())
        .unwrap();
    assert_eq!(velocity.u, Some(11.0));
    assert_eq!(velocity.v, Some(11.0));
    // No `w` variable in the dataset
    assert_eq!(velocity.w, None);
    assert_approx_eq!(velocity.direction_deg().unwrap(), 45.0, 1e-9);
}
