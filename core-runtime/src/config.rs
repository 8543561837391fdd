//! # Core Configuration Module
//!
//! Provides configuration management for the scan pipeline.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and the tunables of the upload and
//! sync components. Validation is fail-fast: `build()` refuses to produce a
//! config that the pipeline could not run with.
//!
//! ## Required Dependencies
//!
//! - `RemoteScanService` - Upload, list and delete scans on the backend
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `Notifier` - User-facing messages (desktop default: `TracingNotifier`)
//! - `PreviewProvider` - Local previews (desktop default: `TempFilePreviewProvider`)
//! - `Clock` - Time source (default: `SystemClock`)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, UploadSettings};
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .remote_service(Arc::new(MyScanApi::new()))
//!     .cache_database_path("/path/to/scans.db")
//!     .upload_settings(UploadSettings {
//!         completion_grace_period: Duration::from_millis(1500),
//!         ..UploadSettings::default()
//!     })
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No RemoteScanService: fails with CapabilityMissing
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing remote service");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, Notifier, PreviewProvider, RemoteScanService, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Ten mebibytes.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Mime types admitted by default.
pub const DEFAULT_ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

pub const DEFAULT_COMPLETION_GRACE_PERIOD: Duration = Duration::from_millis(1000);

const MAX_COMPLETION_GRACE_PERIOD: Duration = Duration::from_secs(60);

const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Admission and execution tunables for the upload queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    /// Files strictly larger than this are rejected
    pub max_file_size_bytes: u64,

    pub accepted_mime_types: Vec<String>,

    /// How long a completed job stays visible before it is evicted
    pub completion_grace_period: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            completion_grace_period: DEFAULT_COMPLETION_GRACE_PERIOD,
        }
    }
}

impl UploadSettings {
    pub fn accepts(&self, mime_type: &str) -> bool {
        self.accepted_mime_types.iter().any(|m| m == mime_type)
    }

    /// Human readable size limit, e.g. `10MB`, `1.5MB` or `512KB`.
    ///
    /// Uses the largest unit the limit reaches and one decimal, rounded
    /// down so the label never overstates the limit.
    pub fn max_size_label(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * KB;

        let bytes = self.max_file_size_bytes;
        let (unit, suffix) = match bytes {
            b if b >= MB => (MB, "MB"),
            b if b >= KB => (KB, "KB"),
            _ => return format!("{bytes}B"),
        };

        let whole = bytes / unit;
        let tenths = (bytes % unit) * 10 / unit;
        if tenths == 0 {
            format!("{whole}{suffix}")
        } else {
            format!("{whole}.{tenths}{suffix}")
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_file_size_bytes == 0 {
            return Err(Error::Config(
                "Maximum file size must be greater than 0 bytes".to_string(),
            ));
        }

        if self.accepted_mime_types.is_empty() {
            return Err(Error::Config(
                "At least one accepted mime type is required".to_string(),
            ));
        }

        for mime in &self.accepted_mime_types {
            let valid = mime
                .split_once('/')
                .map(|(kind, sub)| !kind.is_empty() && !sub.is_empty() && !sub.contains('/'))
                .unwrap_or(false);
            if !valid {
                return Err(Error::Config(format!(
                    "Accepted mime type '{}' must have the form type/subtype",
                    mime
                )));
            }
        }

        if self.completion_grace_period > MAX_COMPLETION_GRACE_PERIOD {
            return Err(Error::Config(
                "Completion grace period exceeds maximum of 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Reconciliation tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Ask the backend for archived scans as well
    pub include_archived: bool,

    /// Run one sync automatically once the cache has hydrated and no sync
    /// has completed yet
    pub auto_sync_on_hydration: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            include_archived: false,
            auto_sync_on_hydration: true,
        }
    }
}

/// Core configuration for the scan pipeline.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Backend for upload / fetch / delete (required)
    pub remote_service: Arc<dyn RemoteScanService>,

    pub notifier: Arc<dyn Notifier>,

    pub preview_provider: Arc<dyn PreviewProvider>,

    pub clock: Arc<dyn Clock>,

    pub upload: UploadSettings,

    pub sync: SyncSettings,

    /// SQLite file backing the cache snapshot; `None` keeps it in memory
    pub cache_database_path: Option<PathBuf>,

    /// Capacity of the event bus ring buffer
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("remote_service", &"RemoteScanService { ... }")
            .field("notifier", &"Notifier { ... }")
            .field("preview_provider", &"PreviewProvider { ... }")
            .field("clock", &"Clock { ... }")
            .field("upload", &self.upload)
            .field("sync", &self.sync)
            .field("cache_database_path", &self.cache_database_path)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.upload.validate()?;

        if let Some(path) = &self.cache_database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Cache database path cannot be empty".to_string(),
                ));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn remote_service_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteScanService".to_string(),
        message: "A RemoteScanService implementation is required to upload and list scans. \
                 Inject the host's authenticated API client with .remote_service()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_notifier() -> Result<Arc<dyn Notifier>> {
    use bridge_desktop::TracingNotifier;

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    Ok(notifier)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_notifier() -> Result<Arc<dyn Notifier>> {
    Err(Error::CapabilityMissing {
        capability: "Notifier".to_string(),
        message: "Notifier implementation is required for user-facing messages. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TracingNotifier. \
                 Mobile/Web: inject the host toast or snackbar adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_preview_provider() -> Result<Arc<dyn PreviewProvider>> {
    use bridge_desktop::TempFilePreviewProvider;

    let provider: Arc<dyn PreviewProvider> = Arc::new(TempFilePreviewProvider::new());
    Ok(provider)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_preview_provider() -> Result<Arc<dyn PreviewProvider>> {
    Err(Error::CapabilityMissing {
        capability: "PreviewProvider".to_string(),
        message: "PreviewProvider implementation is required to show queued files. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TempFilePreviewProvider. \
                 Web: inject an object-URL based provider."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    remote_service: Option<Arc<dyn RemoteScanService>>,
    notifier: Option<Arc<dyn Notifier>>,
    preview_provider: Option<Arc<dyn PreviewProvider>>,
    clock: Option<Arc<dyn Clock>>,
    upload: Option<UploadSettings>,
    sync: Option<SyncSettings>,
    cache_database_path: Option<PathBuf>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the backend implementation (required).
    pub fn remote_service(mut self, service: Arc<dyn RemoteScanService>) -> Self {
        self.remote_service = Some(service);
        self
    }

    /// Sets the notifier. Defaults to the desktop notifier under
    /// `desktop-shims`.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn preview_provider(mut self, provider: Arc<dyn PreviewProvider>) -> Self {
        self.preview_provider = Some(provider);
        self
    }

    /// Sets the time source. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn upload_settings(mut self, settings: UploadSettings) -> Self {
        self.upload = Some(settings);
        self
    }

    /// Shortcut for overriding only the completion grace period.
    pub fn completion_grace_period(mut self, period: Duration) -> Self {
        self.upload
            .get_or_insert_with(UploadSettings::default)
            .completion_grace_period = period;
        self
    }

    pub fn sync_settings(mut self, settings: SyncSettings) -> Self {
        self.sync = Some(settings);
        self
    }

    /// Persist the cache snapshot to a SQLite file at `path`.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .cache_database_path("/path/to/scans.db");
    /// ```
    pub fn cache_database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_database_path = Some(path.into());
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if the remote service is missing, an optional bridge
    /// has no platform default, or a setting is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let remote_service = self
            .remote_service
            .ok_or_else(remote_service_missing_error)?;

        let notifier = match self.notifier {
            Some(notifier) => notifier,
            None => provide_default_notifier()?,
        };

        let preview_provider = match self.preview_provider {
            Some(provider) => provider,
            None => provide_default_preview_provider()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            remote_service,
            notifier,
            preview_provider,
            clock,
            upload: self.upload.unwrap_or_default(),
            sync: self.sync.unwrap_or_default(),
            cache_database_path: self.cache_database_path,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
