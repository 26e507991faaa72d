//! Remote access to gridded ocean and lice-pressure data.
//!
//! - [`HttpFetcher`]: bounded-timeout GET with exponential backoff on
//!   transient failures; non-2xx statuses and blank bodies are errors
//! - [`RemoteGridSource`]: OPeNDAP ASCII responses parsed on a blocking
//!   worker, projections from DAS metadata, THREDDS catalog discovery
//! - [`LookupClient`]: municipality and weather by coordinate
//! - URL helpers for weekly period files and hyperslab queries
//!
//! All failures are [`SourceError`]s, which convert into
//! [`GridError`](grid_common::GridError) for the repository boundary.

pub mod catalog;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod lookup;
pub mod source;
pub mod urls;

pub use catalog::{most_recent, parse_catalog, CatalogEntry};
pub use client::HttpFetcher;
pub use config::SourceConfig;
pub use credentials::{CredentialProvider, StaticToken};
pub use error::{SourceError, SourceResult};
pub use lookup::{LookupClient, LookupEndpoints, WeatherSnapshot};
pub use source::{ProjectedAxes, RemoteGridSource};
pub use urls::{das_url, join_url, period_url, AsciiQuery, AxisRange, PeriodTemplate};
