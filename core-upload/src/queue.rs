//! Upload Queue
//!
//! Holds the jobs the user picked that have not left the pipeline yet.
//! Admission validates each candidate file independently, so one bad file
//! never blocks the rest of a drop. Every job owns a [`PreviewHandle`]; the
//! handle is dropped (and the preview released) whenever the job leaves the
//! queue, after the queue lock has been released.
//!
//! Queue edits are never blocked by an in-flight batch. Jobs added while a
//! batch runs stay `idle` until the next `upload_all`.

use std::fmt;
use std::sync::Arc;

use bridge_traits::{LocalFile, Notifier, PreviewProvider};
use core_async::sync::Mutex;
use core_runtime::config::UploadSettings;
use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, UploadError};
use crate::pending::{PendingUpload, QueuedUpload, UploadId, UploadStatus, UploadTicket};
use crate::preview::PreviewHandle;
use crate::stats::SessionStatsTracker;

/// Why a candidate file was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AdmissionError {
    UnsupportedType { mime_type: String },
    TooLarge {
        file_name: String,
        size_bytes: u64,
        max_label: String,
    },
    PreviewUnavailable { file_name: String, message: String },
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionError::UnsupportedType { mime_type } => {
                write!(f, "Unsupported file type: {}", mime_type)
            }
            AdmissionError::TooLarge {
                file_name,
                max_label,
                ..
            } => write!(f, "File too large: {} (max {})", file_name, max_label),
            AdmissionError::PreviewUnavailable { file_name, message } => {
                write!(f, "Could not prepare preview for {}: {}", file_name, message)
            }
        }
    }
}

impl std::error::Error for AdmissionError {}

/// Result of one `add_files` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionReport {
    pub admitted: Vec<UploadId>,
    /// `(file name, reason)` per rejected file, in input order
    pub rejected: Vec<(String, AdmissionError)>,
}

impl AdmissionReport {
    pub fn admitted_count(&self) -> usize {
        self.admitted.len()
    }

    pub fn is_fully_admitted(&self) -> bool {
        self.rejected.is_empty()
    }
}

pub struct UploadQueue {
    jobs: Mutex<Vec<QueuedUpload>>,
    settings: UploadSettings,
    preview_provider: Arc<dyn PreviewProvider>,
    notifier: Arc<dyn Notifier>,
    stats: Arc<SessionStatsTracker>,
    event_bus: EventBus,
}

impl UploadQueue {
    pub fn new(
        settings: UploadSettings,
        preview_provider: Arc<dyn PreviewProvider>,
        notifier: Arc<dyn Notifier>,
        stats: Arc<SessionStatsTracker>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            settings,
            preview_provider,
            notifier,
            stats,
            event_bus,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<SessionStatsTracker> {
        &self.stats
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    fn emit(&self, event: UploadEvent) {
        self.event_bus.emit(CoreEvent::Upload(event)).ok();
    }

    async fn admit(&self, file: &LocalFile) -> std::result::Result<PreviewHandle, AdmissionError> {
        if !self.settings.accepts(&file.mime_type) {
            return Err(AdmissionError::UnsupportedType {
                mime_type: file.mime_type.clone(),
            });
        }

        if file.size_bytes > self.settings.max_file_size_bytes {
            return Err(AdmissionError::TooLarge {
                file_name: file.name.clone(),
                size_bytes: file.size_bytes,
                max_label: self.settings.max_size_label(),
            });
        }

        let locator = self
            .preview_provider
            .acquire(file)
            .await
            .map_err(|e| AdmissionError::PreviewUnavailable {
                file_name: file.name.clone(),
                message: e.to_string(),
            })?;

        Ok(PreviewHandle::new(locator, Arc::clone(&self.preview_provider)))
    }

    /// Validate and enqueue candidate files.
    ///
    /// Each rejection is reported to the notifier and in the returned report;
    /// admitted files start out `idle`.
    pub async fn add_files(&self, files: Vec<LocalFile>) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        let mut admitted = Vec::new();

        for file in files {
            match self.admit(&file).await {
                Ok(preview) => {
                    let job = QueuedUpload::new(file, preview);
                    report.admitted.push(job.id);
                    admitted.push(job);
                }
                Err(reason) => {
                    warn!(file_name = %file.name, reason = %reason, "Rejected file");
                    self.notifier.error(&reason.to_string());
                    self.emit(UploadEvent::FileRejected {
                        file_name: file.name.clone(),
                        reason: reason.to_string(),
                    });
                    report.rejected.push((file.name, reason));
                }
            }
        }

        if admitted.is_empty() {
            return report;
        }

        let count = admitted.len();
        self.jobs.lock().await.extend(admitted);
        self.stats.record_added(count);

        info!(count, "Added files to upload queue");
        self.notifier
            .success(&format!("Added {} file(s) to upload queue", count));
        self.emit(UploadEvent::FilesAdded { count });

        report
    }

    /// Remove jobs by id. Unknown ids are ignored, so repeating a removal is
    /// a no-op.
    pub async fn remove_files(&self, ids: &[UploadId]) -> usize {
        let removed: Vec<QueuedUpload> = {
            let mut jobs = self.jobs.lock().await;
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *jobs)
                .into_iter()
                .partition(|job| ids.contains(&job.id));
            *jobs = kept;
            removed
        };

        let count = removed.len();
        drop(removed);

        if count > 0 {
            debug!(count, "Removed files from upload queue");
            self.emit(UploadEvent::FilesRemoved { count });
        }

        count
    }

    /// Rename a job that is not currently uploading.
    pub async fn rename_file(&self, id: UploadId, new_name: &str) -> Result<()> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(UploadError::InvalidName(new_name.to_string()));
        }

        {
            let mut jobs = self.jobs.lock().await;
            let job = jobs
                .iter_mut()
                .find(|job| job.id == id)
                .ok_or(UploadError::NotFound(id))?;

            if job.status == UploadStatus::Uploading {
                return Err(UploadError::RenameWhileUploading(id));
            }

            job.name = name.to_string();
        }

        self.emit(UploadEvent::JobRenamed {
            upload_id: id.to_string(),
            name: name.to_string(),
        });

        Ok(())
    }

    /// Drop every job, whatever its status.
    pub async fn clear_all(&self) -> usize {
        let removed = std::mem::take(&mut *self.jobs.lock().await);
        let count = removed.len();
        drop(removed);

        info!(count, "Cleared upload queue");
        self.notifier.info("All files cleared");
        if count > 0 {
            self.emit(UploadEvent::FilesRemoved { count });
        }

        count
    }

    pub async fn snapshot(&self) -> Vec<PendingUpload> {
        self.jobs.lock().await.iter().map(QueuedUpload::view).collect()
    }

    pub async fn get(&self, id: UploadId) -> Option<PendingUpload> {
        self.jobs
            .lock()
            .await
            .iter()
            .find(|job| job.id == id)
            .map(QueuedUpload::view)
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    pub async fn eligible_count(&self) -> usize {
        self.jobs
            .lock()
            .await
            .iter()
            .filter(|job| job.status.is_eligible())
            .count()
    }

    pub fn reset_session_stats(&self) {
        self.stats.reset();
        self.emit(UploadEvent::SessionStatsReset);
    }

    /// Move every `idle` or `failed` job to `uploading` in one critical
    /// section and hand back what the executor needs to send them.
    pub(crate) async fn begin_batch(&self) -> Vec<UploadTicket> {
        let mut jobs = self.jobs.lock().await;
        jobs.iter_mut()
            .filter(|job| job.status.is_eligible())
            .map(|job| {
                job.status = UploadStatus::Uploading;
                job.error = None;
                UploadTicket {
                    id: job.id,
                    name: job.name.clone(),
                    file: job.file.clone(),
                }
            })
            .collect()
    }

    /// Returns `false` when the job was removed while it was uploading.
    pub(crate) async fn mark_completed(&self, id: UploadId) -> bool {
        self.set_outcome(id, UploadStatus::Completed, None).await
    }

    pub(crate) async fn mark_failed(&self, id: UploadId, message: String) -> bool {
        self.set_outcome(id, UploadStatus::Failed, Some(message)).await
    }

    async fn set_outcome(&self, id: UploadId, status: UploadStatus, error: Option<String>) -> bool {
        let mut jobs = self.jobs.lock().await;
        match jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                job.status = status;
                job.error = error;
                true
            }
            None => false,
        }
    }

    /// Remove a job once its completion grace period is over. Only completed
    /// jobs are evicted.
    pub(crate) async fn evict_completed(&self, id: UploadId) -> bool {
        let evicted = {
            let mut jobs = self.jobs.lock().await;
            jobs.iter()
                .position(|job| job.id == id && job.status == UploadStatus::Completed)
                .map(|index| jobs.remove(index))
        };

        match evicted {
            Some(job) => {
                drop(job);
                debug!(upload_id = %id, "Evicted completed upload");
                self.emit(UploadEvent::JobEvicted {
                    upload_id: id.to_string(),
                });
                true
            }
            None => false,
        }
    }
}
