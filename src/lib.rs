//! Workspace umbrella crate.
//!
//! Re-exports the [`core_service`] façade so host applications can depend on
//! `scan-pipeline-workspace` alone. The façade, and with it the desktop
//! notifier and preview adapters, is behind the default `desktop-shims`
//! feature.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
