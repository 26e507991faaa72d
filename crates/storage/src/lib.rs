//! In-memory storage for loaded grid data.
//!
//! Provides [`Repository`], a keyed single-flight cache. Each repository
//! memoises one kind of loaded value (a parsed grid, a site snapshot, a
//! lookup result) for the lifetime of the process:
//! - Concurrent requests for the same key share one load
//! - Only successful loads are stored
//! - Entries live until invalidated or cleared

pub mod repository;

pub use repository::{Repository, RepositoryStats};
