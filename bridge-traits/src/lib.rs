//! # Host Bridge Traits
//!
//! Contracts between the scan pipeline core and the host application.
//!
//! ## Traits
//!
//! ### Backend
//! - [`RemoteScanService`](remote::RemoteScanService) - Upload, list and delete scans
//!
//! ### User interface
//! - [`Notifier`](notify::Notifier) - Success / error / info messages
//! - [`PreviewProvider`](preview::PreviewProvider) - Acquire and release local file previews
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Capability          | Required | Desktop default (`bridge-desktop`) |
//! |---------------------|----------|------------------------------------|
//! | `RemoteScanService` | yes      | none, the host must inject one     |
//! | `Notifier`          | no       | `TracingNotifier`                  |
//! | `PreviewProvider`   | no       | `TempFilePreviewProvider`          |
//! | `Clock`             | no       | `SystemClock`                      |
//!
//! The core fails fast with `CapabilityMissing` when a required capability is
//! absent at build time.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across spawned tasks behind `Arc<dyn Trait>`.

pub mod error;
pub mod notify;
pub mod preview;
pub mod remote;
pub mod time;

pub use error::BridgeError;

pub use notify::{NoopNotifier, Notifier};
pub use preview::{LocalFile, PreviewProvider};
pub use remote::{DeleteOutcome, RemoteScan, RemoteScanService, UploadOutcome, UPLOAD_CREATED_STATUS};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};

#[cfg(any(test, feature = "mocks"))]
pub use remote::MockRemoteScanService;
