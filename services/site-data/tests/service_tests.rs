//! End-to-end service tests against a local fixture server.

use chrono::{NaiveDate, TimeZone, Utc};
use futures::future::join_all;
use grid_common::{GeoPoint, MunicipalityCode, Period, Site};
use grid_source::{HttpFetcher, SourceConfig};
use projection::GridIndex;
use site_data::{load_config, parse_config, AppConfig, SiteDataService};
use std::io::Write;
use std::time::Duration;
use test_utils::{
    assert_approx_eq, index_encoded_values, linear_grid, sites, AsciiResponse, Fixture,
    FixtureServer, LICE_CATALOG_XML, MUNICIPALITY_EMPTY_JSON, MUNICIPALITY_JSON, WEATHER_JSON,
};

const OCEAN_PATH: &str = "/thredds/dodsC/norkyst.nc.ascii";
const CATALOG_PATH: &str = "/thredds/catalog/lice/catalog.xml";
const MUNICIPALITY_PATH: &str = "/adresser/punktsok";
const WEATHER_PATH: &str = "/weather/compact";

fn config_yaml(base: &str) -> String {
    format!(
        r#"
source:
  request_timeout_ms: 2000
  connect_timeout_ms: 1000
  max_retries: 1
  initial_retry_delay_ms: 10
  max_retry_delay_ms: 20
sampler:
  default_radius: 1
ocean:
  id: norkyst
  dataset_url: {base}/thredds/dodsC/norkyst.nc
  projection: &grid
    kind: linear
    origin_lat: {lat}
    origin_lon: {lon}
    lat_deg_per_meter: {dlat}
    lon_deg_per_meter: {dlon}
    cell_size_m: {cell}
    rows: {rows}
    columns: {columns}
  window_radius: 1
lice:
  id: lice
  base_url: {base}/thredds/dodsC/lice
  catalog_url: {base}{catalog}
  file_template: "lice_{{year}}_{{week:02}}.nc"
  variable:
    name: infectious_pressure
    sentinel:
      kind: magnitude_above
      threshold: 1.0e30
    axes: [Y, X]
  projection: *grid
  history_periods: 3
  radius: 0
lookups:
  municipality_url: {base}{municipality}
  weather_url: {base}{weather}
"#,
        base = base,
        lat = linear_grid::ORIGIN_LAT,
        lon = linear_grid::ORIGIN_LON,
        dlat = linear_grid::DEG_PER_METER_LAT,
        dlon = linear_grid::DEG_PER_METER_LON,
        cell = linear_grid::CELL_SIZE,
        rows = linear_grid::ROWS,
        columns = linear_grid::COLUMNS,
        catalog = CATALOG_PATH,
        municipality = MUNICIPALITY_PATH,
        weather = WEATHER_PATH,
    )
}

fn test_config(server: &FixtureServer) -> AppConfig {
    let mut config = parse_config(&config_yaml(server.base_url())).unwrap();
    // The fixture model has no vertical velocity
    config.ocean.variables.w = None;
    config
}

fn service(server: &FixtureServer) -> SiteDataService {
    let config = test_config(server);
    let fetcher = HttpFetcher::new(config.source.clone()).unwrap();
    SiteDataService::with_fetcher(config, fetcher)
}

fn fjord_site() -> Site {
    let (id, name, lat, lon) = sites::FJORD_SITE;
    Site::new(id, name, lat, lon)
}

/// 3x3 window around cell (3, 4) of the linear grid, one time step and
/// depth. Salinity is missing at the centre.
fn ocean_window_response() -> String {
    let shape = [("time", 1), ("depth", 1), ("Y", 3), ("X", 3)];
    let mut salinity = vec![4000.0; 9];
    salinity[4] = -32767.0;

    AsciiResponse::new("norkyst.nc")
        .grid("temperature", "Int16", &shape, &[250.0; 9])
        .grid("salinity", "Int16", &shape, &salinity)
        .grid("u", "Int16", &shape, &[300.0; 9])
        .grid("v", "Int16", &shape, &[400.0; 9])
        .axis("time", &[1_710_158_400.0])
        .axis("depth", &[0.0])
        .render()
}

fn lice_response(offset: f64) -> String {
    let values: Vec<f64> = index_encoded_values(&[linear_grid::ROWS, linear_grid::COLUMNS])
        .into_iter()
        .map(|v| v + offset)
        .collect();
    AsciiResponse::new("lice.nc")
        .grid(
            "infectious_pressure",
            "Float32",
            &[("Y", linear_grid::ROWS), ("X", linear_grid::COLUMNS)],
            &values,
        )
        .render()
}

// ============================================================================
// Site conditions
// ============================================================================

#[tokio::test]
async fn test_site_conditions_from_window() {
    let server = FixtureServer::start([(OCEAN_PATH, Fixture::ok(ocean_window_response()))]).await;
    let service = service(&server);

    let conditions = service.site_conditions(&fjord_site()).await.unwrap();

    assert_eq!(conditions.cell, GridIndex::new(3, 4));
    assert_approx_eq!(conditions.temperature.unwrap(), 12.5, 1e-9);
    // Centre is missing, so the neighbour mean is used
    assert_approx_eq!(conditions.salinity.unwrap(), 34.0, 1e-9);
    assert_approx_eq!(conditions.speed.unwrap(), 0.5, 1e-9);
    assert_approx_eq!(conditions.direction_deg.unwrap(), 36.869_897_645_844, 1e-6);
    assert_eq!(conditions.velocity.w, None);
    assert_eq!(
        conditions.time,
        Some(Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap())
    );
    assert_eq!(conditions.depth, Some(0.0));

    let query = &server.queries()[0];
    assert!(query.starts_with("temperature[0:1:0][0:1:0][2:1:4][3:1:5],salinity"));
    assert!(query.ends_with("time[0:1:0],depth[0:1:0]"));
}

#[tokio::test]
async fn test_site_conditions_cached_and_cleared() {
    let server = FixtureServer::start([(OCEAN_PATH, Fixture::ok(ocean_window_response()))]).await;
    let service = service(&server);
    let site = fjord_site();

    let first = service.site_conditions(&site).await.unwrap();
    let second = service.site_conditions(&site).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.hits(OCEAN_PATH), 1);

    service.invalidate_site(site.id).await;
    service.site_conditions(&site).await.unwrap();
    assert_eq!(server.hits(OCEAN_PATH), 2);

    service.clear_all().await;
    service.site_conditions(&site).await.unwrap();
    assert_eq!(server.hits(OCEAN_PATH), 3);

    let stats = service.stats().await;
    assert_eq!(stats["site_conditions"].loads, 3);
    assert_eq!(stats["site_conditions"].hits, 1);
}

#[tokio::test]
async fn test_concurrent_site_requests_share_one_fetch() {
    let server = FixtureServer::start([(
        OCEAN_PATH,
        Fixture::ok(ocean_window_response()).delayed(Duration::from_millis(100)),
    )])
    .await;
    let service = service(&server);
    let site = fjord_site();

    let results = join_all((0..8).map(|_| service.site_conditions(&site))).await;
    assert!(results.iter().all(Option::is_some));
    assert_eq!(server.hits(OCEAN_PATH), 1);
}

#[tokio::test]
async fn test_unavailable_ocean_data_is_not_cached() {
    let server = FixtureServer::start([("/unrelated", Fixture::ok("x"))]).await;
    let service = service(&server);
    let site = fjord_site();

    assert!(service.site_conditions(&site).await.is_none());
    assert!(service.site_conditions(&site).await.is_none());
    // 404 is not retried, but every call tries again
    assert_eq!(server.hits(OCEAN_PATH), 2);
}

// ============================================================================
// Lice pressure
// ============================================================================

#[tokio::test]
async fn test_lice_history_skips_missing_periods() {
    let server = FixtureServer::start([
        (CATALOG_PATH, Fixture::ok(LICE_CATALOG_XML)),
        (
            "/thredds/dodsC/lice/lice_2024_10.nc.ascii",
            Fixture::ok(lice_response(0.0)),
        ),
        (
            "/thredds/dodsC/lice/lice_2024_08.nc.ascii",
            Fixture::ok(lice_response(100.0)),
        ),
    ])
    .await;
    let service = service(&server);

    let history = service.lice_history(&fjord_site()).await.unwrap();
    let points: Vec<(Period, f64)> = history.iter().map(|p| (p.period, p.value)).collect();
    assert_eq!(
        points,
        vec![(Period::new(2024, 10), 34.0), (Period::new(2024, 8), 134.0)]
    );

    // The missing week was not cached and is requested again
    assert!(service.lice_grid(Period::new(2024, 9)).await.is_none());
    assert_eq!(server.hits("/thredds/dodsC/lice/lice_2024_09.nc.ascii"), 2);
    // Loaded weeks are reused
    assert!(service.lice_grid(Period::new(2024, 10)).await.is_some());
    assert_eq!(server.hits("/thredds/dodsC/lice/lice_2024_10.nc.ascii"), 1);
}

#[tokio::test]
async fn test_lice_pressure_for_new_year_date() {
    let server = FixtureServer::start([(
        "/thredds/dodsC/lice/lice_2023_52.nc.ascii",
        Fixture::ok(lice_response(0.5)),
    )])
    .await;
    let service = service(&server);

    // Jan 3rd computes to week 0, published as week 52 of the previous year
    let period = service.period_for(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    assert_eq!(period, Period::new(2023, 52));

    let value = service.lice_pressure(&fjord_site(), period).await;
    assert_eq!(value, Some(34.5));
}

// ============================================================================
// Lookups
// ============================================================================

#[tokio::test]
async fn test_municipality_cached_per_coordinate() {
    let server = FixtureServer::start([(MUNICIPALITY_PATH, Fixture::ok(MUNICIPALITY_JSON))]).await;
    let service = service(&server);
    let point = GeoPoint::new(65.84, 12.21);

    for _ in 0..2 {
        assert_eq!(
            service.municipality(point).await,
            Some(MunicipalityCode("1820".to_string()))
        );
    }
    assert_eq!(server.hits(MUNICIPALITY_PATH), 1);
}

#[tokio::test]
async fn test_municipality_not_found_is_retried() {
    let server =
        FixtureServer::start([(MUNICIPALITY_PATH, Fixture::ok(MUNICIPALITY_EMPTY_JSON))]).await;
    let service = service(&server);
    let point = GeoPoint::new(70.0, 20.0);

    assert_eq!(service.municipality(point).await, None);
    assert_eq!(service.municipality(point).await, None);
    assert_eq!(server.hits(MUNICIPALITY_PATH), 2);
}

#[tokio::test]
async fn test_weather() {
    let server = FixtureServer::start([(WEATHER_PATH, Fixture::ok(WEATHER_JSON))]).await;
    let service = service(&server);

    let weather = service.weather(GeoPoint::new(65.84, 12.21)).await.unwrap();
    assert_eq!(weather.air_temperature, Some(4.2));
    assert_eq!(weather.relative_humidity, Some(81.5));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(config_yaml("http://127.0.0.1:9").as_bytes())
        .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.ocean.id, "norkyst");
    assert_eq!(config.lice.history_periods, 3);
    assert_eq!(config.source.max_retries, 1);
}

#[test]
fn test_missing_token_fails_construction() {
    let mut config = parse_config(&config_yaml("http://127.0.0.1:9")).unwrap();
    config.lookups.weather_requires_token = true;
    config.credentials.token_env = "SITE_DATA_TEST_TOKEN_UNSET".to_string();
    std::env::remove_var("SITE_DATA_TEST_TOKEN_UNSET");

    assert!(SiteDataService::new(config).is_err());
}

#[test]
fn test_source_config_is_validated() {
    let yaml = config_yaml("http://127.0.0.1:9")
        .replace("request_timeout_ms: 2000", "request_timeout_ms: 0");
    assert!(parse_config(&yaml).is_err());
    assert!(SourceConfig::default().validate().is_ok());
}
