//! # Sync Coordinator
//!
//! Pulls the authoritative scan list from the remote service and replaces the
//! local cache with it.
//!
//! ## Workflow
//!
//! 1. Claim the in-flight flag (or return `AlreadySyncing`)
//! 2. Fetch scans from the remote, archived ones only if configured
//! 3. Stamp every record with the local cache time
//! 4. Replace the cache contents and record the sync time
//! 5. Release the flag, whatever happened
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncCoordinator, SyncOutcome};
//! use std::sync::Arc;
//!
//! # async fn example(coordinator: Arc<SyncCoordinator>) {
//! // Arm the one-shot bootstrap; it waits for hydration on its own
//! coordinator.spawn_auto_sync();
//!
//! // Manual refresh
//! if let SyncOutcome::Synced { scan_count, .. } = coordinator.sync_scans().await {
//!     println!("{scan_count} scans");
//! }
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_traits::{Clock, RemoteScanService};
use chrono::{DateTime, Utc};
use core_async::task::JoinHandle;
use core_library::{CachedScan, LocalCacheStore};
use core_runtime::config::SyncSettings;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use tracing::{debug, error, info, instrument};

use crate::{Result, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another sync was in flight; nothing was fetched.
    AlreadySyncing,
    Synced {
        scan_count: usize,
        synced_at: DateTime<Utc>,
    },
    /// The cache was left as it was.
    Failed { message: String },
}

/// Clears the in-flight flag on every exit path.
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    remote: Arc<dyn RemoteScanService>,
    cache: Arc<LocalCacheStore>,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    event_bus: EventBus,
    is_syncing: AtomicBool,
    /// Latched by the first bootstrap attempt, successful or not
    bootstrap_attempted: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteScanService>,
        cache: Arc<LocalCacheStore>,
        clock: Arc<dyn Clock>,
        settings: SyncSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            remote,
            cache,
            clock,
            settings,
            event_bus,
            is_syncing: AtomicBool::new(false),
            bootstrap_attempted: AtomicBool::new(false),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::Acquire)
    }

    pub fn bootstrap_attempted(&self) -> bool {
        self.bootstrap_attempted.load(Ordering::Acquire)
    }

    pub fn cache(&self) -> &Arc<LocalCacheStore> {
        &self.cache
    }

    fn emit(&self, event: SyncEvent) {
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }

    /// Replace the cache with the remote scan list.
    #[instrument(skip(self))]
    pub async fn sync_scans(&self) -> SyncOutcome {
        let Some(_guard) = SyncGuard::acquire(&self.is_syncing) else {
            debug!("Sync already in progress");
            return SyncOutcome::AlreadySyncing;
        };

        self.emit(SyncEvent::Started);

        let records = match self.remote.fetch(self.settings.include_archived).await {
            Ok(records) => records,
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "Failed to sync scans");
                self.emit(SyncEvent::Failed {
                    message: message.clone(),
                    recoverable: true,
                });
                return SyncOutcome::Failed { message };
            }
        };

        let synced_at = self.clock.now();
        let scans: Vec<CachedScan> = records
            .into_iter()
            .map(|record| CachedScan::from_remote(record, synced_at))
            .collect();
        let scan_count = scans.len();

        self.cache.set_scans(scans).await;
        self.cache.set_last_sync_timestamp(Some(synced_at)).await;

        info!(scan_count, "Synced scans from remote");
        self.emit(SyncEvent::Completed {
            scan_count,
            synced_at: synced_at.timestamp_millis(),
        });

        SyncOutcome::Synced {
            scan_count,
            synced_at,
        }
    }

    /// Run the cold-start sync if the cache has hydrated and has never been
    /// synced. At most one attempt per coordinator; returns `None` when the
    /// bootstrap does not apply.
    pub async fn maybe_auto_sync(&self) -> Option<SyncOutcome> {
        if !self.settings.auto_sync_on_hydration || !self.cache.has_hydrated() {
            return None;
        }

        if self.cache.last_sync_timestamp().await.is_some() {
            return None;
        }

        if self
            .bootstrap_attempted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        info!("Running initial sync after hydration");
        Some(self.sync_scans().await)
    }

    /// Wait for hydration in the background, then run [`maybe_auto_sync`].
    ///
    /// [`maybe_auto_sync`]: Self::maybe_auto_sync
    pub fn spawn_auto_sync(self: &Arc<Self>) -> JoinHandle<Option<SyncOutcome>> {
        let coordinator = Arc::clone(self);
        core_async::spawn(async move {
            coordinator.cache.wait_until_hydrated().await;
            coordinator.maybe_auto_sync().await
        })
    }

    /// Delete a scan remotely, then drop it from the cache.
    #[instrument(skip(self))]
    pub async fn delete_scan(&self, scan_id: &str) -> Result<()> {
        let scan = self
            .cache
            .get_scan(scan_id)
            .await
            .ok_or_else(|| SyncError::ScanNotFound {
                scan_id: scan_id.to_string(),
            })?;

        let outcome = self
            .remote
            .delete(&scan.remote_location)
            .await
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        if !outcome.success {
            let message = outcome
                .error
                .unwrap_or_else(|| "Failed to delete scan".to_string());
            error!(scan_id, error = %message, "Failed to delete scan");
            return Err(SyncError::Remote(message));
        }

        self.cache.remove_scan(scan_id).await;
        info!(scan_id, "Deleted scan");
        Ok(())
    }
}
