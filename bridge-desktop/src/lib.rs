//! # Desktop Bridge Implementations
//!
//! Default implementations of the optional bridge traits for desktop hosts
//! (macOS, Windows, Linux):
//! - `Notifier` mirrored to `tracing` ([`TracingNotifier`])
//! - `PreviewProvider` backed by files in the user cache directory
//!   ([`TempFilePreviewProvider`])
//!
//! `RemoteScanService` has no desktop default; the host must inject one.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{TempFilePreviewProvider, TracingNotifier};
//!
//! let config = CoreConfig::builder()
//!     .remote_service(Arc::new(MyScanApi::new()))
//!     .notifier(Arc::new(TracingNotifier))
//!     .preview_provider(Arc::new(TempFilePreviewProvider::new()))
//!     .build()?;
//! ```

mod notifier;
mod preview;

pub use notifier::TracingNotifier;
pub use preview::TempFilePreviewProvider;
