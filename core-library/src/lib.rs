//! # Local Scan Cache
//!
//! Owns the locally cached mirror of the user's uploaded scans.
//!
//! ## Overview
//!
//! This module manages:
//! - The `CachedScan` model with its status and type enumerations
//! - [`LocalCacheStore`]: in-memory state with hydration, selection and
//!   mutation events
//! - [`SnapshotStore`]: the persistence seam, with in-memory and SQLite
//!   implementations

pub mod error;
pub mod models;
pub mod snapshot;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{CachedScan, ScanStatus, ScanType};
pub use snapshot::{InMemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
pub use store::LocalCacheStore;
