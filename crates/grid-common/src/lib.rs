//! Common types and utilities shared across the aquaculture grid crates.

pub mod array;
pub mod error;
pub mod period;
pub mod site;

pub use array::{NdArray, MAX_RANK};
pub use error::{ErrorKind, GridError, GridResult, NoDataExt};
pub use period::{Period, WeekPolicy};
pub use site::{CoordinateKey, GeoPoint, MunicipalityCode, Site, SiteId};
