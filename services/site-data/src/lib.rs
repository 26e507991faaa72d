//! Site data for fish-farming sites.
//!
//! Orchestrates the grid acquisition crates behind one service:
//!
//! ```text
//! caller ──► SiteDataService ──► Repository (single flight, per dataset)
//!                                    │ miss
//!                                    ▼
//!                             RemoteGridSource ──► dap-parser ──► GridSampler
//! ```
//!
//! Every public query returns an immutable snapshot or `None` for "no data".

pub mod config;
pub mod service;
pub mod snapshot;

pub use config::{
    load_config, parse_config, AppConfig, LiceDataset, LinearGrid, OceanDataset, OceanVariables,
    ProjectionSource,
};
pub use service::{summarize, SiteDataService};
pub use snapshot::{GridSummary, LicePressurePoint, SiteConditions};
