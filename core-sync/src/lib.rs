//! # Sync Module
//!
//! Reconciles the local scan cache with the remote scan service.
//!
//! ## Overview
//!
//! - `sync_scans` replaces the cache with the remote listing. It is
//!   single-flight: a call made while another one runs returns
//!   [`SyncOutcome::AlreadySyncing`] without touching the network.
//! - The auto-sync bootstrap runs one sync after the cache has hydrated when
//!   no sync has completed yet in this process.
//! - `delete_scan` removes a scan remotely and then locally.
//!
//! Failures never escape as errors from `sync_scans`; they are logged,
//! published as [`SyncEvent::Failed`](core_runtime::events::SyncEvent) and
//! returned as [`SyncOutcome::Failed`].

pub mod coordinator;
pub mod error;

pub use coordinator::{SyncCoordinator, SyncOutcome};
pub use error::{Result, SyncError};
