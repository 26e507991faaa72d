//! Site data service: the repositories behind every screen.
//!
//! Each logical dataset has its own single-flight [`Repository`]. A miss
//! runs the matching loader, which fetches from the remote source, parses,
//! projects and samples. Loader errors are logged and collapse to `None`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use dap_parser::{GridDataset, VariableSpec};
use futures::future::join_all;
use grid_common::{
    CoordinateKey, GeoPoint, GridError, GridResult, MunicipalityCode, NoDataExt, Period, Site,
    SiteId,
};
use grid_processor::{GridSampler, SampleQuery, SamplerConfig, SiteQuery, Velocity};
use grid_source::{
    period_url, AsciiQuery, AxisRange, HttpFetcher, LookupClient, RemoteGridSource, StaticToken,
    WeatherSnapshot,
};
use projection::ProjectionDefinition;
use std::collections::BTreeMap;
use std::sync::Arc;
use storage::{Repository, RepositoryStats};
use tracing::{debug, info, instrument};

use crate::config::{AppConfig, ProjectionSource};
use crate::snapshot::{GridSummary, LicePressurePoint, SiteConditions};

pub struct SiteDataService {
    config: Arc<AppConfig>,
    source: RemoteGridSource,
    lookups: LookupClient,

    projections: Repository<String, Arc<ProjectionDefinition>>,
    site_conditions: Repository<SiteId, SiteConditions>,
    ocean_grids: Repository<String, Arc<GridDataset>>,
    lice_grids: Repository<Period, Arc<GridDataset>>,
    lice_history: Repository<SiteId, Arc<Vec<LicePressurePoint>>>,
    municipalities: Repository<CoordinateKey, MunicipalityCode>,
    weather: Repository<CoordinateKey, WeatherSnapshot>,
}

impl SiteDataService {
    /// Build the service and its HTTP client from configuration.
    ///
    /// When weather requests need a token, it is read from the environment
    /// variable named in `credentials.token_env`.
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut fetcher =
            HttpFetcher::new(config.source.clone()).context("Failed to create HTTP fetcher")?;

        if config.lookups.weather_requires_token {
            let token = StaticToken::from_env(&config.credentials.token_env)
                .context("Weather lookups require a token")?;
            fetcher = fetcher.with_credentials(Arc::new(token));
        }

        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Build the service around an existing fetcher.
    pub fn with_fetcher(config: AppConfig, fetcher: HttpFetcher) -> Self {
        let lookups = LookupClient::new(fetcher.clone(), config.lookups.clone());

        info!(
            ocean = %config.ocean.id,
            lice = %config.lice.id,
            "Site data service ready"
        );

        Self {
            config: Arc::new(config),
            source: RemoteGridSource::new(fetcher),
            lookups,
            projections: Repository::new("projections"),
            site_conditions: Repository::new("site_conditions"),
            ocean_grids: Repository::new("ocean_grids"),
            lice_grids: Repository::new("lice_grids"),
            lice_history: Repository::new("lice_history"),
            municipalities: Repository::new("municipalities"),
            weather: Repository::new("weather"),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ========================================================================
    // Ocean model
    // ========================================================================

    /// Ocean conditions at a site.
    pub async fn site_conditions(&self, site: &Site) -> Option<SiteConditions> {
        self.site_conditions
            .get_or_try_load(site.id, || self.load_site_conditions(site))
            .await
    }

    /// The configured time step and depth level of the whole ocean grid.
    pub async fn ocean_grid(&self) -> Option<Arc<GridDataset>> {
        let id = self.config.ocean.id.clone();
        self.ocean_grids
            .get_or_try_load(id, || self.load_ocean_grid())
            .await
    }

    /// Projection of the ocean model grid.
    pub async fn ocean_projection(&self) -> Option<Arc<ProjectionDefinition>> {
        let ocean = &self.config.ocean;
        self.projection_for(&ocean.id, &ocean.projection, &ocean.dataset_url)
            .await
    }

    #[instrument(skip(self, site), fields(site = %site.id))]
    async fn load_site_conditions(&self, site: &Site) -> GridResult<SiteConditions> {
        let ocean = &self.config.ocean;
        let projection = self.ocean_projection().await.ok_or_else(|| {
            GridError::unresolved(format!("no projection for dataset '{}'", ocean.id))
        })?;

        let center = projection.locate_point(site.location)?;
        let (first, extent) = projection.extent.window(center, ocean.window_radius);
        let rows = AxisRange::new(first.row, first.row + extent.rows - 1);
        let columns = AxisRange::new(first.column, first.column + extent.columns - 1);

        let dataset = self.fetch_ocean_slab(rows, columns).await?;
        let local = projection.window(first, extent)?;
        let sampler = GridSampler::new(
            Arc::new(dataset),
            Some(Arc::new(local)),
            self.ocean_sampler_config(),
        );

        let query = SiteQuery::new(site.location);
        let at = SampleQuery::new();
        let sample = |spec: &VariableSpec| {
            sampler
                .sample_site(&spec.name, &query, &at)
                .or_no_data(&spec.name)
                .flatten()
        };

        let variables = &ocean.variables;
        let velocity = Velocity::new(
            sample(&variables.u),
            sample(&variables.v),
            variables.w.as_ref().and_then(|w| sample(w)),
        );
        let conditions = SiteConditions {
            site: site.id,
            location: site.location,
            cell: center,
            time: sampler.time_at(0),
            depth: sampler.depth_at(0),
            temperature: sample(&variables.temperature),
            salinity: sample(&variables.salinity),
            speed: velocity.speed(),
            direction_deg: velocity.direction_deg(),
            velocity,
        };

        if !conditions.has_data() {
            return Err(GridError::missing(format!(
                "no ocean data around site {}",
                site.id
            )));
        }
        debug!(cell = ?center, "Sampled site conditions");
        Ok(conditions)
    }

    async fn load_ocean_grid(&self) -> GridResult<Arc<GridDataset>> {
        let ocean = &self.config.ocean;
        let projection = self.ocean_projection().await.ok_or_else(|| {
            GridError::unresolved(format!("no projection for dataset '{}'", ocean.id))
        })?;

        let extent = projection.extent;
        let dataset = self
            .fetch_ocean_slab(
                AxisRange::new(0, extent.max_row()),
                AxisRange::new(0, extent.max_column()),
            )
            .await?;
        Ok(Arc::new(dataset))
    }

    /// Every ocean field over the given rows and columns at the configured
    /// time step and depth, plus the matching time and depth coordinates.
    async fn fetch_ocean_slab(
        &self,
        rows: AxisRange,
        columns: AxisRange,
    ) -> GridResult<GridDataset> {
        let ocean = &self.config.ocean;
        let variables = &ocean.variables;
        let time = AxisRange::single(ocean.time_index);
        let depth = AxisRange::single(ocean.depth_index);

        let fields = variables.fields();
        let mut query = AsciiQuery::new(ocean.dataset_url.as_str());
        for spec in &fields {
            query = query.hyperslab(spec.name.as_str(), &[time, depth, rows, columns]);
        }
        query = query
            .hyperslab(variables.time_axis.as_str(), &[time])
            .hyperslab(variables.depth_axis.as_str(), &[depth]);

        let mut specs: Vec<VariableSpec> = fields.into_iter().cloned().collect();
        specs.push(VariableSpec::axis(&variables.time_axis));
        specs.push(VariableSpec::axis(&variables.depth_axis));

        Ok(self.source.fetch_query(&query, specs).await?)
    }

    fn ocean_sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            time_axis: self.config.ocean.variables.time_axis.clone(),
            depth_axis: self.config.ocean.variables.depth_axis.clone(),
            ..self.config.sampler.clone()
        }
    }

    // ========================================================================
    // Lice pressure
    // ========================================================================

    /// Period published for a reference date.
    pub fn period_for(&self, date: NaiveDate) -> Period {
        Period::from_date(date, &self.config.week_policy)
    }

    /// Lice pressure grid for one period.
    pub async fn lice_grid(&self, period: Period) -> Option<Arc<GridDataset>> {
        self.lice_grids
            .get_or_try_load(period, || self.load_lice_grid(period))
            .await
    }

    /// Lice pressure at a site for one period.
    pub async fn lice_pressure(&self, site: &Site, period: Period) -> Option<f64> {
        let grid = self.lice_grid(period).await?;
        let projection = self.lice_projection(period).await?;
        self.sample_lice(grid, projection, site)
    }

    /// Most recent lice pressure values at a site, newest first.
    ///
    /// Periods without a value at the site are skipped.
    pub async fn lice_history(&self, site: &Site) -> Option<Arc<Vec<LicePressurePoint>>> {
        self.lice_history
            .get_or_try_load(site.id, || self.load_lice_history(site))
            .await
    }

    async fn lice_projection(&self, period: Period) -> Option<Arc<ProjectionDefinition>> {
        let lice = &self.config.lice;
        let url = period_url(&lice.base_url, &lice.file_template, period);
        self.projection_for(&lice.id, &lice.projection, &url).await
    }

    #[instrument(skip(self, period), fields(period = %period))]
    async fn load_lice_grid(&self, period: Period) -> GridResult<Arc<GridDataset>> {
        let lice = &self.config.lice;
        let query = AsciiQuery::new(period_url(&lice.base_url, &lice.file_template, period))
            .variable(lice.variable.name.as_str());
        let dataset = self
            .source
            .fetch_query(&query, vec![lice.variable.clone()])
            .await?;
        Ok(Arc::new(dataset))
    }

    #[instrument(skip(self, site), fields(site = %site.id))]
    async fn load_lice_history(&self, site: &Site) -> GridResult<Arc<Vec<LicePressurePoint>>> {
        let lice = &self.config.lice;
        let periods = self
            .source
            .recent_periods(&lice.catalog_url, &lice.file_template, lice.history_periods)
            .await?;
        let latest = periods
            .first()
            .copied()
            .ok_or_else(|| GridError::missing("catalog lists no lice periods"))?;
        let projection = self.lice_projection(latest).await.ok_or_else(|| {
            GridError::unresolved(format!("no projection for dataset '{}'", lice.id))
        })?;

        let grids = join_all(periods.iter().map(|period| self.lice_grid(*period))).await;
        let history: Vec<LicePressurePoint> = periods
            .iter()
            .zip(grids)
            .filter_map(|(period, grid)| {
                let value = self.sample_lice(grid?, Arc::clone(&projection), site)?;
                Some(LicePressurePoint {
                    period: *period,
                    value,
                })
            })
            .collect();

        if history.is_empty() {
            return Err(GridError::missing(format!(
                "no lice pressure at site {} in the last {} periods",
                site.id, lice.history_periods
            )));
        }
        debug!(points = history.len(), "Built lice history");
        Ok(Arc::new(history))
    }

    fn sample_lice(
        &self,
        grid: Arc<GridDataset>,
        projection: Arc<ProjectionDefinition>,
        site: &Site,
    ) -> Option<f64> {
        let lice = &self.config.lice;
        let sampler = GridSampler::new(grid, Some(projection), self.config.sampler.clone());
        let query = SiteQuery::new(site.location).with_radius(lice.radius);
        sampler
            .sample_site(&lice.variable.name, &query, &SampleQuery::new())
            .or_no_data("lice_pressure")
            .flatten()
    }

    // ========================================================================
    // Coordinate lookups
    // ========================================================================

    /// Municipality code of the nearest address.
    pub async fn municipality(&self, point: GeoPoint) -> Option<MunicipalityCode> {
        self.municipalities
            .get_or_try_load(CoordinateKey::from(point), || self.load_municipality(point))
            .await
    }

    /// Current weather at a coordinate.
    pub async fn weather(&self, point: GeoPoint) -> Option<WeatherSnapshot> {
        self.weather
            .get_or_try_load(CoordinateKey::from(point), || self.load_weather(point))
            .await
    }

    async fn load_municipality(&self, point: GeoPoint) -> GridResult<MunicipalityCode> {
        self.lookups.municipality(point).await?.ok_or_else(|| {
            GridError::missing(format!("no address near ({}, {})", point.lat, point.lon))
        })
    }

    async fn load_weather(&self, point: GeoPoint) -> GridResult<WeatherSnapshot> {
        self.lookups.weather(point).await?.ok_or_else(|| {
            GridError::missing(format!("empty forecast for ({}, {})", point.lat, point.lon))
        })
    }

    // ========================================================================
    // Projections
    // ========================================================================

    async fn projection_for(
        &self,
        id: &str,
        source: &ProjectionSource,
        dataset_url: &str,
    ) -> Option<Arc<ProjectionDefinition>> {
        self.projections
            .get_or_try_load(id.to_string(), || self.load_projection(source, dataset_url))
            .await
    }

    async fn load_projection(
        &self,
        source: &ProjectionSource,
        dataset_url: &str,
    ) -> GridResult<Arc<ProjectionDefinition>> {
        let definition = match source {
            ProjectionSource::Linear(grid) => grid.definition()?,
            ProjectionSource::Metadata { variable, .. } => {
                self.source
                    .fetch_projection(dataset_url, variable, &source.axes())
                    .await?
            }
        };
        Ok(Arc::new(definition))
    }

    // ========================================================================
    // Cache management
    // ========================================================================

    /// Drop everything cached for one site.
    pub async fn invalidate_site(&self, site: SiteId) {
        self.site_conditions.invalidate(&site).await;
        self.lice_history.invalidate(&site).await;
    }

    /// Drop every cached value, e.g. under memory pressure.
    pub async fn clear_all(&self) {
        self.projections.clear().await;
        self.site_conditions.clear().await;
        self.ocean_grids.clear().await;
        self.lice_grids.clear().await;
        self.lice_history.clear().await;
        self.municipalities.clear().await;
        self.weather.clear().await;
        info!("Cleared all repositories");
    }

    /// Statistics per repository.
    pub async fn stats(&self) -> BTreeMap<&'static str, RepositoryStats> {
        let mut stats = BTreeMap::new();
        stats.insert(self.projections.name(), self.projections.stats().await);
        stats.insert(self.site_conditions.name(), self.site_conditions.stats().await);
        stats.insert(self.ocean_grids.name(), self.ocean_grids.stats().await);
        stats.insert(self.lice_grids.name(), self.lice_grids.stats().await);
        stats.insert(self.lice_history.name(), self.lice_history.stats().await);
        stats.insert(self.municipalities.name(), self.municipalities.stats().await);
        stats.insert(self.weather.name(), self.weather.stats().await);
        stats
    }
}

/// Per-variable summary of a grid.
pub fn summarize(dataset: &GridDataset) -> Vec<GridSummary> {
    dataset
        .names()
        .into_iter()
        .filter_map(|name| {
            let array = dataset.array(name)?;
            let (min, max) = array.present_values().fold((None, None), |(lo, hi), v| {
                (
                    Some(lo.map_or(v, |m: f64| m.min(v))),
                    Some(hi.map_or(v, |m: f64| m.max(v))),
                )
            });
            Some(GridSummary {
                variable: name.to_string(),
                shape: array.shape().to_vec(),
                cells: array.len(),
                missing: array.missing_count(),
                min,
                max,
            })
        })
        .collect()
}
