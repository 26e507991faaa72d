//! Remote grid datasets: fetch ASCII responses and parse them off the
//! async runtime.

use dap_parser::{
    grid_geometry, parse_das, parse_dataset, projection_from_attributes, AttributeValue,
    GridDataset, ParseError, VariableSpec,
};
use grid_common::Period;
use projection::ProjectionDefinition;
use tracing::{debug, info, instrument};

use crate::catalog::{most_recent, parse_catalog, CatalogEntry};
use crate::client::HttpFetcher;
use crate::error::{SourceError, SourceResult};
use crate::urls::{das_url, AsciiQuery, PeriodTemplate};

/// Axis variable names of a projected grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedAxes {
    pub x: String,
    pub y: String,
}

impl Default for ProjectedAxes {
    fn default() -> Self {
        Self {
            x: "X".to_string(),
            y: "Y".to_string(),
        }
    }
}

/// Client for one OPeNDAP/THREDDS server.
#[derive(Debug, Clone)]
pub struct RemoteGridSource {
    fetcher: HttpFetcher,
}

impl RemoteGridSource {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.fetcher
    }

    /// Fetch an ASCII response and parse the requested variables.
    #[instrument(skip(self, specs), fields(url = %url, variables = specs.len()))]
    pub async fn fetch_dataset(
        &self,
        url: &str,
        specs: Vec<VariableSpec>,
    ) -> SourceResult<GridDataset> {
        let body = self.fetcher.fetch_text(url).await?;
        let dataset = parse_blocking(body, specs).await?;
        debug!(variables = dataset.len(), "Parsed dataset");
        Ok(dataset)
    }

    pub async fn fetch_query(
        &self,
        query: &AsciiQuery,
        specs: Vec<VariableSpec>,
    ) -> SourceResult<GridDataset> {
        self.fetch_dataset(&query.url(), specs).await
    }

    /// Build the grid projection of `variable` from the dataset metadata.
    ///
    /// Reads the `grid_mapping` container from the attribute response and
    /// derives origin, cell size and extent from the projected axes.
    #[instrument(skip(self, axes), fields(url = %dataset_url))]
    pub async fn fetch_projection(
        &self,
        dataset_url: &str,
        variable: &str,
        axes: &ProjectedAxes,
    ) -> SourceResult<ProjectionDefinition> {
        let das = self.fetcher.fetch_text(&das_url(dataset_url)).await?;
        let table = parse_das(&das)?;

        let container = table
            .get(variable, "grid_mapping")
            .and_then(AttributeValue::as_str)
            .or_else(|| table.grid_mapping_container())
            .ok_or_else(|| ParseError::MissingAttribute(format!("{}:grid_mapping", variable)))?
            .to_string();

        let query = AsciiQuery::new(dataset_url)
            .variable(axes.x.as_str())
            .variable(axes.y.as_str());
        let coordinates = self
            .fetch_query(
                &query,
                vec![VariableSpec::axis(&axes.x), VariableSpec::axis(&axes.y)],
            )
            .await?;

        let x = coordinates
            .axis_values(&axes.x)
            .ok_or_else(|| ParseError::missing_header(axes.x.as_str()))?;
        let y = coordinates
            .axis_values(&axes.y)
            .ok_or_else(|| ParseError::missing_header(axes.y.as_str()))?;

        let (origin, cell_size, extent) = grid_geometry(&x, &y)?;
        let definition = projection_from_attributes(&table, &container, origin, cell_size, extent)?;

        info!(
            container = %container,
            rows = extent.rows,
            columns = extent.columns,
            dx = cell_size.dx,
            dy = cell_size.dy,
            "Resolved grid projection"
        );
        Ok(definition)
    }

    /// Period files listed in a THREDDS catalog, most recent first.
    #[instrument(skip(self, template), fields(url = %catalog_url))]
    pub async fn fetch_catalog(
        &self,
        catalog_url: &str,
        template: &PeriodTemplate,
    ) -> SourceResult<Vec<CatalogEntry>> {
        let xml = self.fetcher.fetch_text(catalog_url).await?;
        let entries = parse_catalog(&xml, template)?;
        debug!(entries = entries.len(), "Parsed catalog");
        Ok(entries)
    }

    /// The `count` most recent periods available in a catalog.
    pub async fn recent_periods(
        &self,
        catalog_url: &str,
        template: &PeriodTemplate,
        count: usize,
    ) -> SourceResult<Vec<Period>> {
        let entries = self.fetch_catalog(catalog_url, template).await?;
        Ok(most_recent(&entries, count)
            .iter()
            .map(|entry| entry.period)
            .collect())
    }
}

async fn parse_blocking(body: String, specs: Vec<VariableSpec>) -> SourceResult<GridDataset> {
    tokio::task::spawn_blocking(move || parse_dataset(&body, &specs))
        .await
        .map_err(|e| SourceError::Task(e.to_string()))?
        .map_err(SourceError::from)
}
