//! Upload Executor
//!
//! Sends every eligible job of the [`UploadQueue`] to the remote service as
//! one batch. Jobs run concurrently and settle independently: a failing job
//! is recorded on the job itself and never cancels its siblings. Only one
//! batch runs at a time; queue edits stay possible while it does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_traits::{Clock, RemoteScanService};
use core_async::time::sleep;
use core_library::{CachedScan, LocalCacheStore};
use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::pending::{UploadId, UploadTicket};
use crate::queue::UploadQueue;

/// Per-batch outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub completed: Vec<UploadId>,
    /// `(job, error text)` for every job that failed
    pub failed: Vec<(UploadId, String)>,
}

impl BatchSummary {
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResult {
    /// No `idle` or `failed` job was queued.
    NothingToUpload,
    /// Another `upload_all` is still in flight.
    AlreadyRunning,
    Settled(BatchSummary),
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct UploadExecutor {
    queue: Arc<UploadQueue>,
    remote: Arc<dyn RemoteScanService>,
    cache: Arc<LocalCacheStore>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    is_uploading: AtomicBool,
}

impl UploadExecutor {
    pub fn new(
        queue: Arc<UploadQueue>,
        remote: Arc<dyn RemoteScanService>,
        cache: Arc<LocalCacheStore>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            queue,
            remote,
            cache,
            clock,
            event_bus,
            is_uploading: AtomicBool::new(false),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.is_uploading.load(Ordering::Acquire)
    }

    pub fn queue(&self) -> &Arc<UploadQueue> {
        &self.queue
    }

    fn emit(&self, event: UploadEvent) {
        self.event_bus.emit(CoreEvent::Upload(event)).ok();
    }

    /// Upload every `idle` and `failed` job.
    ///
    /// Resolves once each job of the batch is either `completed` or `failed`.
    /// Completed jobs are evicted from the queue after the configured grace
    /// period; failed ones stay for a retry.
    #[instrument(skip(self))]
    pub async fn upload_all(&self) -> BatchResult {
        let Some(_in_flight) = InFlight::acquire(&self.is_uploading) else {
            debug!("Upload batch already running");
            return BatchResult::AlreadyRunning;
        };

        let tickets = self.queue.begin_batch().await;
        if tickets.is_empty() {
            self.queue.notifier().info("No files to upload");
            return BatchResult::NothingToUpload;
        }

        info!(job_count = tickets.len(), "Starting upload batch");
        self.emit(UploadEvent::BatchStarted {
            job_count: tickets.len(),
        });

        let results =
            core_async::join_all(tickets.into_iter().map(|ticket| self.run_job(ticket))).await;

        let mut summary = BatchSummary::default();
        for (id, result) in results {
            match result {
                Ok(()) => summary.completed.push(id),
                Err(message) => summary.failed.push((id, message)),
            }
        }

        let (completed, failed) = (summary.completed_count(), summary.failed_count());
        self.queue.stats().record_batch(completed, failed);

        let notifier = self.queue.notifier();
        if completed > 0 {
            notifier.success(&format!("Successfully uploaded {} scan(s)", completed));
        }
        if failed > 0 {
            notifier.error(&format!("Failed to upload {} scan(s)", failed));
        }

        info!(completed, failed, "Upload batch settled");
        self.emit(UploadEvent::BatchSettled { completed, failed });

        BatchResult::Settled(summary)
    }

    async fn run_job(&self, ticket: UploadTicket) -> (UploadId, Result<(), String>) {
        let id = ticket.id;
        let result = self.send(ticket).await;

        match &result {
            Ok(scan) => {
                let scan_id = scan.id.clone();
                self.cache.upsert_scan(scan.clone()).await;

                if self.queue.mark_completed(id).await {
                    self.schedule_eviction(id);
                }

                debug!(upload_id = %id, scan_id = %scan_id, "Upload completed");
                self.emit(UploadEvent::JobCompleted {
                    upload_id: id.to_string(),
                    scan_id,
                });
            }
            Err(message) => {
                warn!(upload_id = %id, error = %message, "Upload failed");
                self.queue.mark_failed(id, message.clone()).await;
                self.emit(UploadEvent::JobFailed {
                    upload_id: id.to_string(),
                    message: message.clone(),
                });
            }
        }

        (id, result.map(|_| ()))
    }

    async fn send(&self, ticket: UploadTicket) -> Result<CachedScan, String> {
        let outcome = self
            .remote
            .upload(ticket.file.data, &ticket.name, &ticket.file.mime_type)
            .await
            .map_err(|e| e.to_string())?;

        let record = outcome.created_record()?;
        Ok(CachedScan::from_remote(record, self.clock.now()))
    }

    fn schedule_eviction(&self, id: UploadId) {
        let queue = Arc::clone(&self.queue);
        let grace = queue.settings().completion_grace_period;

        core_async::spawn(async move {
            sleep(grace).await;
            queue.evict_completed(id).await;
        });
    }
}
