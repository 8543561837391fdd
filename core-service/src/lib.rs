//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (remote scan
//! service, notifier, preview provider, clock) into the upload and sync
//! pipeline. Desktop apps typically enable the `desktop-shims` feature, which
//! fills in the notifier and preview provider from `bridge-desktop` and adds
//! [`bootstrap_desktop`].
//!
//! ```rust,ignore
//! let config = CoreConfig::builder()
//!     .remote_service(remote)
//!     .cache_database_path("scans.db")
//!     .build()?;
//!
//! let service = ScanService::new(config).await?;
//! service.start().await;
//!
//! service.add_files(files).await;
//! service.upload_all().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::{LocalFile, RemoteScanService};
pub use core_library::{CachedScan, ScanStatus};
pub use core_runtime::config::{CoreConfig, SyncSettings, UploadSettings};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};
pub use core_sync::SyncOutcome;
pub use core_upload::{AdmissionReport, BatchResult, PendingUpload, SessionStats, UploadId};

use std::sync::Arc;

use core_library::{InMemorySnapshotStore, LocalCacheStore, SnapshotStore, SqliteSnapshotStore};
use core_sync::SyncCoordinator;
use core_upload::{SessionStatsTracker, UploadExecutor, UploadQueue};
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct ScanService {
    event_bus: EventBus,
    cache: Arc<LocalCacheStore>,
    queue: Arc<UploadQueue>,
    executor: Arc<UploadExecutor>,
    sync: Arc<SyncCoordinator>,
}

impl ScanService {
    /// Build every component from a validated configuration.
    ///
    /// The cache is not hydrated yet; call [`start`](Self::start).
    pub async fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);

        let snapshot: Arc<dyn SnapshotStore> = match &config.cache_database_path {
            Some(path) => Arc::new(SqliteSnapshotStore::open(path).await?),
            None => Arc::new(InMemorySnapshotStore::new()),
        };
        let cache = Arc::new(LocalCacheStore::new(snapshot, event_bus.clone()));

        let queue = Arc::new(UploadQueue::new(
            config.upload.clone(),
            Arc::clone(&config.preview_provider),
            Arc::clone(&config.notifier),
            Arc::new(SessionStatsTracker::new()),
            event_bus.clone(),
        ));

        let executor = Arc::new(UploadExecutor::new(
            Arc::clone(&queue),
            Arc::clone(&config.remote_service),
            Arc::clone(&cache),
            Arc::clone(&config.clock),
            event_bus.clone(),
        ));

        let sync = Arc::new(SyncCoordinator::new(
            Arc::clone(&config.remote_service),
            Arc::clone(&cache),
            Arc::clone(&config.clock),
            config.sync,
            event_bus.clone(),
        ));

        Ok(Self {
            event_bus,
            cache,
            queue,
            executor,
            sync,
        })
    }

    /// Hydrate the cache and arm the one-shot initial sync.
    ///
    /// Returns the number of scans loaded from the snapshot. The initial
    /// sync, if it applies, runs in the background.
    pub async fn start(&self) -> usize {
        let scan_count = self.cache.hydrate().await;
        self.sync.spawn_auto_sync();
        info!(scan_count, "Scan service started");
        scan_count
    }

    pub fn events(&self) -> EventStream {
        self.event_bus.stream()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn cache(&self) -> &Arc<LocalCacheStore> {
        &self.cache
    }

    pub fn queue(&self) -> &Arc<UploadQueue> {
        &self.queue
    }

    pub fn executor(&self) -> &Arc<UploadExecutor> {
        &self.executor
    }

    pub fn sync_coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.sync
    }

    // ------------------------------------------------------------------
    // Upload queue
    // ------------------------------------------------------------------

    pub async fn add_files(&self, files: Vec<LocalFile>) -> AdmissionReport {
        self.queue.add_files(files).await
    }

    pub async fn remove_files(&self, ids: &[UploadId]) -> usize {
        self.queue.remove_files(ids).await
    }

    pub async fn rename_file(&self, id: UploadId, name: &str) -> Result<()> {
        Ok(self.queue.rename_file(id, name).await?)
    }

    pub async fn clear_all(&self) -> usize {
        self.queue.clear_all().await
    }

    pub async fn pending_uploads(&self) -> Vec<PendingUpload> {
        self.queue.snapshot().await
    }

    pub async fn upload_all(&self) -> BatchResult {
        self.executor.upload_all().await
    }

    pub fn is_uploading(&self) -> bool {
        self.executor.is_uploading()
    }

    pub fn session_stats(&self) -> SessionStats {
        self.queue.stats().snapshot()
    }

    pub fn reset_session_stats(&self) {
        self.queue.reset_session_stats();
    }

    // ------------------------------------------------------------------
    // Cache and sync
    // ------------------------------------------------------------------

    /// Scans consumers should display (`READY` only).
    pub async fn scans(&self) -> Vec<CachedScan> {
        self.cache.visible_scans().await
    }

    pub async fn sync_scans(&self) -> SyncOutcome {
        self.sync.sync_scans().await
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    pub async fn delete_scan(&self, scan_id: &str) -> Result<()> {
        Ok(self.sync.delete_scan(scan_id).await?)
    }
}

/// Convenience bootstrapper for desktop hosts: desktop notifier and preview
/// provider, snapshot persisted at `cache_database_path` when given.
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(
    remote_service: Arc<dyn RemoteScanService>,
    cache_database_path: Option<std::path::PathBuf>,
) -> Result<ScanService> {
    let mut builder = CoreConfig::builder().remote_service(remote_service);
    if let Some(path) = cache_database_path {
        builder = builder.cache_database_path(path);
    }

    let service = ScanService::new(builder.build()?).await?;
    service.start().await;
    Ok(service)
}
