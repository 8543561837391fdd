//! # Local Cache Store
//!
//! Hydrated, persisted mirror of the user's remote scans.
//!
//! The store is an explicitly constructed object shared through `Arc`; the
//! upload executor appends to it and the sync coordinator replaces it. Every
//! mutation is published on the [`EventBus`] as a [`CacheEvent`] and written
//! through to the [`SnapshotStore`].
//!
//! Consumers read [`LocalCacheStore::visible_scans`], which only returns
//! `ready` scans. Archived, processing and failed records stay in the cache
//! but are hidden.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_async::sync::{watch, Mutex, RwLock};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use tracing::{debug, info, instrument, warn};

use crate::models::{CachedScan, ScanStatus};
use crate::snapshot::SnapshotStore;

#[derive(Debug, Default)]
struct CacheState {
    scans: Vec<CachedScan>,
    /// Selected scan ids in selection order
    selected: Vec<String>,
    last_sync: Option<DateTime<Utc>>,
    /// Set when the whole list was replaced before hydration; the snapshot
    /// is then stale and must not be merged back in
    replaced_before_hydration: bool,
}

impl CacheState {
    fn position(&self, scan_id: &str) -> Option<usize> {
        self.scans.iter().position(|s| s.id == scan_id)
    }

    fn retain_selection(&mut self) {
        let known: HashSet<&str> = self.scans.iter().map(|s| s.id.as_str()).collect();
        self.selected.retain(|id| known.contains(id.as_str()));
    }
}

fn matched_ids(state: &CacheState, ids: &HashSet<&str>) -> Vec<String> {
    state
        .scans
        .iter()
        .filter(|s| ids.contains(s.id.as_str()))
        .map(|s| s.id.clone())
        .collect()
}

pub struct LocalCacheStore {
    state: RwLock<CacheState>,
    hydrated: watch::Sender<bool>,
    snapshot: Arc<dyn SnapshotStore>,
    /// Serialises mutate-then-persist so snapshots are written in order
    write_lock: Mutex<()>,
    event_bus: EventBus,
}

impl LocalCacheStore {
    pub fn new(snapshot: Arc<dyn SnapshotStore>, event_bus: EventBus) -> Self {
        let (hydrated, _) = watch::channel(false);
        Self {
            state: RwLock::new(CacheState::default()),
            hydrated,
            snapshot,
            write_lock: Mutex::new(()),
            event_bus,
        }
    }

    // ------------------------------------------------------------------
    // Hydration
    // ------------------------------------------------------------------

    /// Load the persisted snapshot into memory and mark the store hydrated.
    ///
    /// A snapshot that cannot be read is logged and treated as empty; the
    /// store still hydrates so the application can proceed. Calling this
    /// again after hydration is a no-op returning the current scan count.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) -> usize {
        let _write = self.write_lock.lock().await;

        if self.has_hydrated() {
            return self.state.read().await.scans.len();
        }

        let persisted = match self.snapshot.load().await {
            Ok(scans) => scans,
            Err(e) => {
                warn!(error = %e, "Failed to load scan snapshot, starting empty");
                Vec::new()
            }
        };

        let (scan_count, merged) = {
            let mut state = self.state.write().await;
            if std::mem::take(&mut state.replaced_before_hydration) {
                // A sync or clear already replaced the list; it wins over
                // whatever the previous run persisted.
                debug!(
                    discarded = persisted.len(),
                    "Cache replaced before hydration, ignoring snapshot"
                );
                (state.scans.len(), Some(state.scans.clone()))
            } else {
                // Scans recorded before hydration finished go after the
                // persisted list, skipping ids the snapshot already has.
                let early = std::mem::take(&mut state.scans);
                let had_early = !early.is_empty();
                state.scans = persisted;
                for scan in early {
                    if state.position(&scan.id).is_none() {
                        state.scans.push(scan);
                    }
                }
                (state.scans.len(), had_early.then(|| state.scans.clone()))
            }
        };

        if let Some(scans) = merged {
            if let Err(e) = self.snapshot.save(&scans).await {
                warn!(error = %e, "Failed to persist merged scan snapshot");
            }
        }

        self.hydrated.send_replace(true);
        info!(scan_count, "Local cache hydrated");
        self.event_bus
            .emit(CoreEvent::Cache(CacheEvent::Hydrated { scan_count }))
            .ok();

        scan_count
    }

    pub fn has_hydrated(&self) -> bool {
        *self.hydrated.borrow()
    }

    /// Resolves once [`hydrate`](Self::hydrate) has completed.
    pub async fn wait_until_hydrated(&self) {
        let mut rx = self.hydrated.subscribe();
        // The sender lives as long as `self`, so this only ends on `true`
        rx.wait_for(|hydrated| *hydrated).await.ok();
    }

    pub fn subscribe_hydration(&self) -> watch::Receiver<bool> {
        self.hydrated.subscribe()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Every cached scan, hidden statuses included.
    pub async fn scans(&self) -> Vec<CachedScan> {
        self.state.read().await.scans.clone()
    }

    /// Scans shown to consumers: status `ready` only.
    pub async fn visible_scans(&self) -> Vec<CachedScan> {
        self.state
            .read()
            .await
            .scans
            .iter()
            .filter(|s| s.is_visible())
            .cloned()
            .collect()
    }

    pub async fn get_scan(&self, scan_id: &str) -> Option<CachedScan> {
        let state = self.state.read().await;
        state.position(scan_id).map(|idx| state.scans[idx].clone())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.scans.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.scans.is_empty()
    }

    pub async fn last_sync_timestamp(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_sync
    }

    pub async fn set_last_sync_timestamp(&self, timestamp: Option<DateTime<Utc>>) {
        self.state.write().await.last_sync = timestamp;
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Apply `change` under the state lock, then persist and publish when it
    /// reports an event.
    async fn commit<R>(&self, change: impl FnOnce(&mut CacheState) -> (R, Option<CacheEvent>)) -> R {
        let _write = self.write_lock.lock().await;

        let (result, event, scans) = {
            let mut state = self.state.write().await;
            let (result, event) = change(&mut *state);
            let scans = event.as_ref().map(|_| state.scans.clone());
            (result, event, scans)
        };

        if let (Some(event), Some(scans)) = (event, scans) {
            // Before hydration the snapshot still holds the previous run's
            // data; `hydrate` persists the merged list instead.
            if self.has_hydrated() {
                if let Err(e) = self.snapshot.save(&scans).await {
                    warn!(error = %e, scan_count = scans.len(), "Failed to persist scan snapshot");
                }
            }
            self.event_bus.emit(CoreEvent::Cache(event)).ok();
        }

        result
    }

    /// Replace the whole cache.
    ///
    /// Ids are unique in the cache: when `scans` repeats an id, the first
    /// occurrence is kept and later ones are dropped.
    pub async fn set_scans(&self, scans: Vec<CachedScan>) {
        self.commit(|state| {
            let mut seen = HashSet::with_capacity(scans.len());
            let received = scans.len();
            let scans: Vec<CachedScan> = scans
                .into_iter()
                .filter(|s| seen.insert(s.id.clone()))
                .collect();
            if scans.len() < received {
                warn!(
                    duplicates = received - scans.len(),
                    "Dropped scans with repeated ids"
                );
            }

            let scan_count = scans.len();
            state.scans = scans;
            state.retain_selection();
            state.replaced_before_hydration |= !self.has_hydrated();
            debug!(scan_count, "Replaced cached scans");
            ((), Some(CacheEvent::Replaced { scan_count }))
        })
        .await
    }

    /// Append a scan. Returns `false`, leaving the cache untouched, when a
    /// scan with the same id is already cached.
    pub async fn add_scan(&self, scan: CachedScan) -> bool {
        self.commit(|state| {
            if state.position(&scan.id).is_some() {
                debug!(scan_id = %scan.id, "Scan already cached, not adding");
                return (false, None);
            }
            let scan_id = scan.id.clone();
            state.scans.push(scan);
            (true, Some(CacheEvent::ScanAdded { scan_id }))
        })
        .await
    }

    /// Replace the scan with the same id, or append it.
    pub async fn upsert_scan(&self, scan: CachedScan) {
        self.commit(|state| {
            let scan_id = scan.id.clone();
            match state.position(&scan.id) {
                Some(idx) => {
                    state.scans[idx] = scan;
                    ((), Some(CacheEvent::ScanUpdated { scan_id }))
                }
                None => {
                    state.scans.push(scan);
                    ((), Some(CacheEvent::ScanAdded { scan_id }))
                }
            }
        })
        .await
    }

    pub async fn remove_scan(&self, scan_id: &str) -> bool {
        self.remove_scans(&[scan_id.to_string()]).await == 1
    }

    /// Remove scans (and their selection). Returns how many were cached.
    pub async fn remove_scans(&self, scan_ids: &[String]) -> usize {
        self.commit(|state| {
            let ids: HashSet<&str> = scan_ids.iter().map(String::as_str).collect();
            let before = state.scans.len();
            let mut removed = Vec::new();
            state.scans.retain(|s| {
                let keep = !ids.contains(s.id.as_str());
                if !keep {
                    removed.push(s.id.clone());
                }
                keep
            });
            state.selected.retain(|id| !ids.contains(id.as_str()));

            let count = before - state.scans.len();
            if count == 0 {
                return (0, None);
            }
            (count, Some(CacheEvent::ScansRemoved { scan_ids: removed }))
        })
        .await
    }

    async fn update_one(&self, scan_id: &str, update: impl FnOnce(&mut CachedScan)) -> bool {
        self.commit(|state| match state.position(scan_id) {
            Some(idx) => {
                update(&mut state.scans[idx]);
                (
                    true,
                    Some(CacheEvent::ScanUpdated {
                        scan_id: scan_id.to_string(),
                    }),
                )
            }
            None => (false, None),
        })
        .await
    }

    pub async fn update_scan_status(&self, scan_id: &str, status: ScanStatus) -> bool {
        self.update_one(scan_id, |scan| scan.status = status).await
    }

    pub async fn update_scan_name(&self, scan_id: &str, name: impl Into<String>) -> bool {
        let name = name.into();
        self.update_one(scan_id, |scan| scan.name = name).await
    }

    /// Merge `metadata` into the scan's metadata, overwriting equal keys.
    pub async fn update_scan_metadata(
        &self,
        scan_id: &str,
        metadata: BTreeMap<String, String>,
    ) -> bool {
        self.update_one(scan_id, |scan| scan.metadata.extend(metadata))
            .await
    }

    /// Tag scans as consumed by an invoice. Returns how many were tagged.
    pub async fn mark_scans_used_by_invoice(
        &self,
        scan_ids: &[String],
        invoice_id: &str,
        at: DateTime<Utc>,
    ) -> usize {
        let tagged_at = at.to_rfc3339();
        self.commit(|state| {
            let ids: HashSet<&str> = scan_ids.iter().map(String::as_str).collect();
            let mut tagged = 0;
            for scan in state.scans.iter_mut().filter(|s| ids.contains(s.id.as_str())) {
                scan.metadata.insert("usedByInvoice".to_string(), "true".to_string());
                scan.metadata.insert("invoiceId".to_string(), invoice_id.to_string());
                scan.metadata.insert("invoiceCreatedAt".to_string(), tagged_at.clone());
                tagged += 1;
            }
            if tagged == 0 {
                return (0, None);
            }
            (tagged, Some(CacheEvent::ScansUpdated { scan_ids: matched_ids(state, &ids) }))
        })
        .await
    }

    /// Set status `archived` and drop the scans from the selection. Returns
    /// how many scans matched.
    pub async fn archive_scans(&self, scan_ids: &[String]) -> usize {
        self.commit(|state| {
            let ids: HashSet<&str> = scan_ids.iter().map(String::as_str).collect();
            let mut archived = 0;
            for scan in state.scans.iter_mut().filter(|s| ids.contains(s.id.as_str())) {
                scan.status = ScanStatus::Archived;
                archived += 1;
            }
            state.selected.retain(|id| !ids.contains(id.as_str()));
            if archived == 0 {
                return (0, None);
            }
            (archived, Some(CacheEvent::ScansUpdated { scan_ids: matched_ids(state, &ids) }))
        })
        .await
    }

    /// Drop every scan and the selection.
    pub async fn clear(&self) {
        self.commit(|state| {
            state.scans.clear();
            state.selected.clear();
            state.replaced_before_hydration |= !self.has_hydrated();
            ((), Some(CacheEvent::Cleared))
        })
        .await
    }

    // ------------------------------------------------------------------
    // Selection (in-memory only)
    // ------------------------------------------------------------------

    /// Flip selection of a cached scan. Returns whether it is now selected;
    /// unknown ids are never selected.
    pub async fn toggle_selection(&self, scan_id: &str) -> bool {
        let mut state = self.state.write().await;
        if let Some(pos) = state.selected.iter().position(|id| id == scan_id) {
            state.selected.remove(pos);
            return false;
        }
        if state.position(scan_id).is_none() {
            return false;
        }
        state.selected.push(scan_id.to_string());
        true
    }

    /// Select exactly the `ready` scans.
    pub async fn select_all_ready(&self) {
        let mut state = self.state.write().await;
        state.selected = state
            .scans
            .iter()
            .filter(|s| s.status == ScanStatus::Ready)
            .map(|s| s.id.clone())
            .collect();
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selected.clear();
    }

    /// Current versions of the selected scans, in selection order.
    pub async fn selected_scans(&self) -> Vec<CachedScan> {
        let state = self.state.read().await;
        state
            .selected
            .iter()
            .filter_map(|id| state.position(id).map(|idx| state.scans[idx].clone()))
            .collect()
    }
}

impl std::fmt::Debug for LocalCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCacheStore")
            .field("has_hydrated", &self.has_hydrated())
            .finish()
    }
}
