//! Grid sampling for parsed ocean and lice datasets.
//!
//! This crate answers "what is the value here?" for a parsed
//! [`GridDataset`](dap_parser::GridDataset):
//!
//! - **Site queries**: resolve a geographic point to its cell through the
//!   dataset's projection in O(1)
//! - **Absolute queries**: read a (time, depth, row, column) address
//! - **Neighbour fallback**: a missing cell yields the mean of the valid
//!   cells within a square radius window
//!
//! # Architecture
//!
//! ```text
//! SiteQuery (lat, lon, radius)
//!      │
//!      ▼
//! ProjectionDefinition::locate ──► GridIndex (row, column)
//!      │
//!      ├─► resolve time / depth (index, nearest, latest)
//!      │
//!      └─► GridSampler::sample_index
//!               │
//!               ├─► cell present: value
//!               │
//!               └─► cell missing: mean of valid neighbours, or no data
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{GridSampler, SampleQuery, SamplerConfig, SiteQuery};
//!
//! let sampler = GridSampler::new(dataset, Some(projection), SamplerConfig::default());
//! let site = SiteQuery::new(GeoPoint::new(65.84, 12.21)).with_radius(1);
//! let salinity = sampler.sample_site("salinity", &site, &SampleQuery::new())?;
//! ```

pub mod config;
pub mod query;
pub mod sampler;
pub mod velocity;

// Re-export commonly used types at crate root
pub use config::SamplerConfig;
pub use query::{DepthSelection, SampleQuery, SiteQuery, TimeSelection};
pub use sampler::{CellAddress, GridSampler, VelocityComponents};
pub use velocity::{direction_degrees, Velocity};
