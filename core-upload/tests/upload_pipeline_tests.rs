//! End-to-end behaviour of the upload queue and executor against scripted
//! remote, preview and notifier fakes.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{
    Clock, DeleteOutcome, FixedClock, LocalFile, MockRemoteScanService, Notifier, PreviewProvider,
    RemoteScan, RemoteScanService, UploadOutcome,
};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use core_async::time::{sleep, Duration};
use core_library::{InMemorySnapshotStore, LocalCacheStore, ScanStatus};
use core_runtime::config::UploadSettings;
use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
use core_upload::{
    AdmissionError, BatchResult, SessionStats, SessionStatsTracker, UploadExecutor, UploadQueue,
    UploadStatus,
};

const MB: u64 = 1024 * 1024;

// ============================================================================
// Fakes
// ============================================================================

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<(&'static str, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.messages.lock().unwrap().push(("success", message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(("error", message.to_string()));
    }

    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(("info", message.to_string()));
    }
}

#[derive(Default)]
struct RecordingPreviews {
    acquired: Mutex<Vec<String>>,
    released: Mutex<Vec<String>>,
}

impl RecordingPreviews {
    fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

#[async_trait]
impl PreviewProvider for RecordingPreviews {
    async fn acquire(&self, file: &LocalFile) -> BridgeResult<String> {
        let mut acquired = self.acquired.lock().unwrap();
        let locator = format!("preview-{}-{}", acquired.len(), file.name);
        acquired.push(locator.clone());
        Ok(locator)
    }

    fn release(&self, locator: &str) {
        self.released.lock().unwrap().push(locator.to_string());
    }
}

/// Remote that stores everything except the file names it is told to
/// reject, optionally after a delay.
#[derive(Default)]
struct ScriptedRemote {
    rejected_names: Mutex<HashSet<String>>,
    unreachable_names: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedRemote {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    fn reject(&self, name: &str) {
        self.rejected_names.lock().unwrap().insert(name.to_string());
    }

    fn make_unreachable(&self, name: &str) {
        self.unreachable_names.lock().unwrap().insert(name.to_string());
    }

    fn accept_all(&self) {
        self.rejected_names.lock().unwrap().clear();
        self.unreachable_names.lock().unwrap().clear();
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteScanService for ScriptedRemote {
    async fn upload(
        &self,
        payload: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> BridgeResult<UploadOutcome> {
        self.calls.lock().unwrap().push(file_name.to_string());
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        if self.unreachable_names.lock().unwrap().contains(file_name) {
            return Err(BridgeError::Remote("connection reset".to_string()));
        }

        if self.rejected_names.lock().unwrap().contains(file_name) {
            return Ok(UploadOutcome::Rejected {
                status: 500,
                error: None,
            });
        }

        Ok(UploadOutcome::Stored {
            status: 201,
            record: RemoteScan {
                id: format!("scan-{file_name}"),
                user_identifier: "user-1".to_string(),
                name: file_name.to_string(),
                remote_location: format!("https://blob.example/{file_name}"),
                mime_type: mime_type.to_string(),
                size_bytes: payload.len() as u64,
                status: "READY".to_string(),
                uploaded_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
                metadata: BTreeMap::new(),
            },
        })
    }

    async fn fetch(&self, _include_archived: bool) -> BridgeResult<Vec<RemoteScan>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _remote_location: &str) -> BridgeResult<DeleteOutcome> {
        Ok(DeleteOutcome::ok())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    queue: Arc<UploadQueue>,
    executor: UploadExecutor,
    cache: Arc<LocalCacheStore>,
    previews: Arc<RecordingPreviews>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<FixedClock>,
    bus: EventBus,
}

async fn harness(remote: Arc<dyn RemoteScanService>, grace: Duration) -> Harness {
    let bus = EventBus::new(256);
    let previews = Arc::new(RecordingPreviews::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    ));

    let settings = UploadSettings {
        completion_grace_period: grace,
        ..UploadSettings::default()
    };

    let queue = Arc::new(UploadQueue::new(
        settings,
        previews.clone(),
        notifier.clone(),
        Arc::new(SessionStatsTracker::new()),
        bus.clone(),
    ));

    let cache = Arc::new(LocalCacheStore::new(
        Arc::new(InMemorySnapshotStore::new()),
        bus.clone(),
    ));
    cache.hydrate().await;

    let executor = UploadExecutor::new(
        queue.clone(),
        remote,
        cache.clone(),
        clock.clone(),
        bus.clone(),
    );

    Harness {
        queue,
        executor,
        cache,
        previews,
        notifier,
        clock,
        bus,
    }
}

fn file(name: &str, mime: &str, size: u64) -> LocalFile {
    LocalFile::new(name, mime, vec![7u8; 16]).with_declared_size(size)
}

fn jpeg(name: &str) -> LocalFile {
    file(name, "image/jpeg", 2 * MB)
}

fn settled(result: BatchResult) -> core_upload::BatchSummary {
    match result {
        BatchResult::Settled(summary) => summary,
        other => panic!("expected a settled batch, got {other:?}"),
    }
}

// ============================================================================
// Admission
// ============================================================================

#[core_async::test]
async fn test_unsupported_type_is_rejected_and_rest_admitted() {
    let h = harness(Arc::new(ScriptedRemote::default()), Duration::from_secs(1)).await;

    let report = h
        .queue
        .add_files(vec![
            file("a.jpg", "image/jpeg", 2 * MB),
            file("b.exe", "application/x-msdownload", MB),
        ])
        .await;

    let queued = h.queue.snapshot().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].name, "a.jpg");
    assert_eq!(queued[0].status, UploadStatus::Idle);
    assert_eq!(
        report.rejected,
        vec![(
            "b.exe".to_string(),
            AdmissionError::UnsupportedType {
                mime_type: "application/x-msdownload".to_string()
            }
        )]
    );

    assert_eq!(
        h.notifier.messages(),
        vec![
            (
                "error",
                "Unsupported file type: application/x-msdownload".to_string()
            ),
            ("success", "Added 1 file(s) to upload queue".to_string()),
        ]
    );
    assert_eq!(h.queue.stats().snapshot().total_added, 1);
}

#[core_async::test]
async fn test_oversize_file_leaves_queue_unchanged() {
    let h = harness(Arc::new(ScriptedRemote::default()), Duration::from_secs(1)).await;

    let report = h
        .queue
        .add_files(vec![file("a.jpg", "image/jpeg", 11 * MB)])
        .await;

    assert!(h.queue.is_empty().await);
    assert_eq!(report.admitted_count(), 0);
    assert!(matches!(report.rejected[0].1, AdmissionError::TooLarge { .. }));
    assert_eq!(
        h.notifier.messages(),
        vec![("error", "File too large: a.jpg (max 10MB)".to_string())]
    );
    assert!(h.previews.acquired.lock().unwrap().is_empty());
    assert_eq!(h.queue.stats().snapshot(), SessionStats::default());
}

#[core_async::test]
async fn test_admission_events() {
    let h = harness(Arc::new(ScriptedRemote::default()), Duration::from_secs(1)).await;
    let mut events = h.bus.subscribe();

    h.queue
        .add_files(vec![jpeg("a.jpg"), file("b.gif", "image/gif", 10)])
        .await;

    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Upload(UploadEvent::FileRejected {
            file_name: "b.gif".to_string(),
            reason: "Unsupported file type: image/gif".to_string(),
        })
    );
    assert_eq!(
        events.recv().await.unwrap(),
        CoreEvent::Upload(UploadEvent::FilesAdded { count: 1 })
    );
}

// ============================================================================
// Preview release
// ============================================================================

#[core_async::test]
async fn test_remove_releases_preview_exactly_once() {
    let h = harness(Arc::new(ScriptedRemote::default()), Duration::from_secs(1)).await;
    let report = h.queue.add_files(vec![jpeg("a.jpg"), jpeg("b.jpg")]).await;
    let a = report.admitted[0];
    let a_preview = h.queue.get(a).await.unwrap().preview_locator;

    assert_eq!(h.queue.remove_files(&[a]).await, 1);
    assert_eq!(h.queue.remove_files(&[a]).await, 0);

    assert_eq!(h.previews.released(), vec![a_preview]);
    assert_eq!(h.queue.len().await, 1);
}

#[core_async::test]
async fn test_clear_all_releases_and_notifies() {
    let h = harness(Arc::new(ScriptedRemote::default()), Duration::from_secs(1)).await;
    h.queue.add_files(vec![jpeg("a.jpg"), jpeg("b.jpg")]).await;

    assert_eq!(h.queue.clear_all().await, 2);

    assert_eq!(h.previews.released().len(), 2);
    assert_eq!(
        h.notifier.messages().last().unwrap(),
        &("info", "All files cleared".to_string())
    );
    // Counters survive the queue being emptied
    assert_eq!(h.queue.stats().snapshot().total_added, 2);
}

#[core_async::test]
async fn test_completed_job_is_evicted_after_grace_period() {
    let h = harness(
        Arc::new(ScriptedRemote::default()),
        Duration::from_millis(10),
    )
    .await;
    let id = h.queue.add_files(vec![jpeg("a.jpg")]).await.admitted[0];

    settled(h.executor.upload_all().await);
    assert_eq!(h.queue.get(id).await.unwrap().status, UploadStatus::Completed);
    assert!(h.previews.released().is_empty());

    sleep(Duration::from_millis(60)).await;

    assert!(h.queue.is_empty().await);
    assert_eq!(h.previews.released().len(), 1);
    assert_eq!(h.queue.stats().snapshot().total_completed, 1);
}

#[core_async::test]
async fn test_removing_an_uploading_job_still_caches_the_result() {
    let remote = Arc::new(ScriptedRemote::slow(Duration::from_millis(20)));
    let h = harness(remote, Duration::from_millis(5)).await;
    let id = h.queue.add_files(vec![jpeg("a.jpg")]).await.admitted[0];

    let batch = h.executor.upload_all();
    let removal = async {
        sleep(Duration::from_millis(5)).await;
        h.queue.remove_files(&[id]).await
    };
    let (result, removed) = futures::join!(batch, removal);

    assert_eq!(removed, 1);
    assert_eq!(settled(result).completed, vec![id]);
    assert!(h.cache.get_scan("scan-a.jpg").await.is_some());

    sleep(Duration::from_millis(20)).await;
    assert_eq!(h.previews.released().len(), 1);
}

// ============================================================================
// Execution
// ============================================================================

#[core_async::test]
async fn test_empty_batch_makes_no_remote_calls() {
    let mut remote = MockRemoteScanService::new();
    remote.expect_upload().never();
    let h = harness(Arc::new(remote), Duration::from_secs(1)).await;

    assert_eq!(h.executor.upload_all().await, BatchResult::NothingToUpload);
    assert_eq!(
        h.notifier.messages(),
        vec![("info", "No files to upload".to_string())]
    );
    assert_eq!(h.queue.stats().snapshot(), SessionStats::default());
    assert!(!h.executor.is_uploading());
}

#[core_async::test]
async fn test_partial_failure_is_isolated() {
    let remote = Arc::new(ScriptedRemote::default());
    remote.reject("c.jpg");
    let h = harness(remote.clone(), Duration::from_secs(5)).await;

    let report = h
        .queue
        .add_files(vec![jpeg("a.jpg"), jpeg("b.jpg"), jpeg("c.jpg"), jpeg("d.jpg")])
        .await;
    let failing = report.admitted[2];

    let summary = settled(h.executor.upload_all().await);

    assert_eq!(summary.completed_count(), 3);
    assert_eq!(
        summary.failed,
        vec![(failing, "Upload failed with status 500".to_string())]
    );

    for job in h.queue.snapshot().await {
        if job.id == failing {
            assert_eq!(job.status, UploadStatus::Failed);
            assert_eq!(job.error.as_deref(), Some("Upload failed with status 500"));
        } else {
            assert_eq!(job.status, UploadStatus::Completed);
            assert_eq!(job.error, None);
        }
    }

    let stats = h.queue.stats().snapshot();
    assert_eq!(stats.total_completed, 3);
    assert_eq!(stats.total_failed, 1);

    let messages = h.notifier.messages();
    assert!(messages.contains(&("success", "Successfully uploaded 3 scan(s)".to_string())));
    assert!(messages.contains(&("error", "Failed to upload 1 scan(s)".to_string())));
}

#[core_async::test]
async fn test_successful_upload_lands_in_cache_with_local_timestamp() {
    let h = harness(Arc::new(ScriptedRemote::default()), Duration::from_secs(1)).await;
    h.queue.add_files(vec![file("r.pdf", "application/pdf", MB)]).await;

    settled(h.executor.upload_all().await);

    let scan = h.cache.get_scan("scan-r.pdf").await.unwrap();
    assert_eq!(scan.status, ScanStatus::Ready);
    assert_eq!(scan.cached_at, h.clock.now());
    assert_eq!(h.cache.visible_scans().await.len(), 1);
}

#[core_async::test]
async fn test_transport_error_text_is_kept_on_the_job() {
    let remote = Arc::new(ScriptedRemote::default());
    remote.make_unreachable("a.jpg");
    let h = harness(remote, Duration::from_secs(1)).await;
    let id = h.queue.add_files(vec![jpeg("a.jpg")]).await.admitted[0];

    settled(h.executor.upload_all().await);

    let job = h.queue.get(id).await.unwrap();
    assert_eq!(job.status, UploadStatus::Failed);
    assert!(job.error.unwrap().contains("connection reset"));
    assert!(h.cache.is_empty().await);
}

#[core_async::test]
async fn test_retry_only_resends_failed_jobs() {
    let remote = Arc::new(ScriptedRemote::default());
    remote.reject("b.jpg");
    let h = harness(remote.clone(), Duration::from_secs(5)).await;
    h.queue
        .add_files(vec![jpeg("a.jpg"), jpeg("b.jpg"), jpeg("c.jpg")])
        .await;

    let first = settled(h.executor.upload_all().await);
    assert_eq!(first.failed_count(), 1);

    remote.accept_all();
    let second = settled(h.executor.upload_all().await);

    assert_eq!(second.completed_count(), 1);
    assert_eq!(second.failed_count(), 0);

    let calls = remote.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[3], "b.jpg");

    let stats = h.queue.stats().snapshot();
    assert_eq!(stats.total_completed, 3);
    assert_eq!(stats.total_failed, 1);
}

#[core_async::test]
async fn test_overlapping_upload_all_is_single_flight() {
    let remote = Arc::new(ScriptedRemote::slow(Duration::from_millis(20)));
    let h = harness(remote.clone(), Duration::from_secs(1)).await;
    h.queue.add_files(vec![jpeg("a.jpg"), jpeg("b.jpg")]).await;

    let results = core_async::join_all(vec![h.executor.upload_all(), h.executor.upload_all()]).await;

    assert_eq!(results[1], BatchResult::AlreadyRunning);
    assert_eq!(settled(results[0].clone()).completed_count(), 2);
    assert_eq!(remote.calls().len(), 2);
    assert!(!h.executor.is_uploading());
}

#[core_async::test]
async fn test_files_added_during_a_batch_wait_for_the_next_one() {
    let remote = Arc::new(ScriptedRemote::slow(Duration::from_millis(20)));
    let h = harness(remote.clone(), Duration::from_secs(1)).await;
    h.queue.add_files(vec![jpeg("a.jpg")]).await;

    let batch = h.executor.upload_all();
    let late = async {
        sleep(Duration::from_millis(5)).await;
        h.queue.add_files(vec![jpeg("late.jpg")]).await
    };
    let (result, report) = futures::join!(batch, late);

    assert_eq!(settled(result).completed_count(), 1);
    let late_id = report.admitted[0];
    assert_eq!(h.queue.get(late_id).await.unwrap().status, UploadStatus::Idle);
    assert_eq!(remote.calls(), vec!["a.jpg".to_string()]);
}

#[core_async::test]
async fn test_batch_events_in_order() {
    let remote = Arc::new(ScriptedRemote::default());
    remote.reject("b.jpg");
    let h = harness(remote, Duration::from_secs(1)).await;
    h.queue.add_files(vec![jpeg("a.jpg"), jpeg("b.jpg")]).await;

    let mut uploads = h
        .bus
        .stream()
        .filter(|event| matches!(event, CoreEvent::Upload(_)));

    settled(h.executor.upload_all().await);

    assert_eq!(
        uploads.recv().await.unwrap(),
        CoreEvent::Upload(UploadEvent::BatchStarted { job_count: 2 })
    );

    let mut last = None;
    while let Some(Ok(event)) = uploads.try_recv() {
        last = Some(event);
    }
    assert_eq!(
        last,
        Some(CoreEvent::Upload(UploadEvent::BatchSettled {
            completed: 1,
            failed: 1
        }))
    );
}

#[core_async::test]
async fn test_reset_session_stats() {
    let h = harness(Arc::new(ScriptedRemote::default()), Duration::from_secs(1)).await;
    h.queue.add_files(vec![jpeg("a.jpg")]).await;
    settled(h.executor.upload_all().await);
    assert_ne!(h.queue.stats().snapshot(), SessionStats::default());

    h.queue.reset_session_stats();

    assert_eq!(h.queue.stats().snapshot(), SessionStats::default());
    // Queue contents are untouched by a reset
    assert_eq!(h.queue.len().await, 1);
}
