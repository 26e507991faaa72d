//! Parser for OPeNDAP ASCII responses from the ocean and lice model servers.
//!
//! This crate turns the text bodies returned by `.ascii?` queries into
//! typed [`NdArray`](grid_common::NdArray) values, and reads `.das`
//! attribute listings for grid mapping metadata.
//!
//! # Decoding
//!
//! Every variable is decoded through a [`VariableSpec`]: raw values matching
//! its [`SentinelPolicy`] become missing cells, everything else is mapped
//! through `raw * scale - offset`. NaN is always missing.
//!
//! # Failure Model
//!
//! Parsing is all-or-nothing per variable, and per dataset: a malformed row,
//! a wrong value count or disagreeing axis lengths fail the whole call.
//! Large bodies should be parsed off the async executor.

pub mod das;
pub mod dataset;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod policy;

pub use das::{grid_geometry, parse_das, projection_from_attributes, AttributeTable, AttributeValue};
pub use dataset::{GridDataset, Variable};
pub use error::{ParseError, ParseResult};
pub use parser::{parse_dataset, parse_declarations, parse_variable, Declaration};
pub use policy::{SentinelPolicy, VariableSpec, FLOAT_FILL_THRESHOLD, INT16_FILL, OCEAN_AXES};
