//! Municipality and weather lookups by coordinate.

use chrono::{DateTime, Utc};
use grid_common::{GeoPoint, MunicipalityCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::HttpFetcher;
use crate::error::SourceResult;

// ============================================================================
// Wire formats
// ============================================================================

#[derive(Debug, Deserialize)]
struct AddressSearch {
    #[serde(default)]
    adresser: Vec<AddressRecord>,
}

#[derive(Debug, Deserialize)]
struct AddressRecord {
    kommunenummer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    #[serde(default)]
    timeseries: Vec<ForecastStep>,
}

#[derive(Debug, Deserialize)]
struct ForecastStep {
    time: DateTime<Utc>,
    data: ForecastData,
}

#[derive(Debug, Deserialize)]
struct ForecastData {
    instant: Instant,
}

#[derive(Debug, Deserialize)]
struct Instant {
    details: InstantDetails,
}

#[derive(Debug, Deserialize)]
struct InstantDetails {
    air_temperature: Option<f64>,
    relative_humidity: Option<f64>,
}

// ============================================================================
// Public API
// ============================================================================

/// Current weather at a coordinate, from the first forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub time: DateTime<Utc>,
    /// Air temperature in °C
    pub air_temperature: Option<f64>,
    /// Relative humidity in percent
    pub relative_humidity: Option<f64>,
}

/// Endpoints for the coordinate lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEndpoints {
    /// Address search, queried with `lat`, `lon` and `radius`
    pub municipality_url: String,
    /// Location forecast, queried with `lat` and `lon`
    pub weather_url: String,
    /// Search radius for the address lookup
    #[serde(default = "default_radius_m")]
    pub municipality_radius_m: u32,
    /// Send a bearer token with weather requests
    #[serde(default)]
    pub weather_requires_token: bool,
}

fn default_radius_m() -> u32 {
    1000
}

/// Coordinate-keyed JSON lookups.
#[derive(Debug, Clone)]
pub struct LookupClient {
    fetcher: HttpFetcher,
    endpoints: LookupEndpoints,
}

impl LookupClient {
    pub fn new(fetcher: HttpFetcher, endpoints: LookupEndpoints) -> Self {
        Self { fetcher, endpoints }
    }

    pub fn municipality_query(&self, point: GeoPoint) -> String {
        format!(
            "{}?lat={}&lon={}&radius={}&treffPerSide=1",
            self.endpoints.municipality_url, point.lat, point.lon, self.endpoints.municipality_radius_m
        )
    }

    pub fn weather_query(&self, point: GeoPoint) -> String {
        format!(
            "{}?lat={:.4}&lon={:.4}",
            self.endpoints.weather_url, point.lat, point.lon
        )
    }

    /// Municipality of the nearest address. `None` when nothing is within
    /// the search radius.
    #[instrument(skip(self), fields(lat = point.lat, lon = point.lon))]
    pub async fn municipality(&self, point: GeoPoint) -> SourceResult<Option<MunicipalityCode>> {
        let search: AddressSearch = self.fetcher.fetch_json(&self.municipality_query(point)).await?;
        let code = search
            .adresser
            .into_iter()
            .find_map(|a| a.kommunenummer.filter(|c| !c.is_empty()))
            .map(MunicipalityCode);
        debug!(code = ?code, "Municipality lookup");
        Ok(code)
    }

    /// Weather from the first forecast step. `None` when the forecast is empty.
    #[instrument(skip(self), fields(lat = point.lat, lon = point.lon))]
    pub async fn weather(&self, point: GeoPoint) -> SourceResult<Option<WeatherSnapshot>> {
        let url = self.weather_query(point);
        let forecast: Forecast = if self.endpoints.weather_requires_token {
            self.fetcher.fetch_json_authorized(&url).await?
        } else {
            self.fetcher.fetch_json(&url).await?
        };

        Ok(forecast
            .properties
            .timeseries
            .into_iter()
            .next()
            .map(|step| WeatherSnapshot {
                time: step.time,
                air_temperature: step.data.instant.details.air_temperature,
                relative_humidity: step.data.instant.details.relative_humidity,
            }))
    }
}
