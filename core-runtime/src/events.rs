//! # Event Bus System
//!
//! Typed observer interface for the scan pipeline, built on
//! `tokio::sync::broadcast`. Components publish what changed; hosts subscribe
//! instead of polling state.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Upload Queue ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │
//! ┌──────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │ Local Cache  ├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! └──────────────┘               │           │                  └────────────┘
//!                                │           │
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │ Sync Coord.  ├──────────────>│           ├─────────────────>│ Subscriber │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
//!
//! let event_bus = EventBus::new(100);
//! let _subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Upload(UploadEvent::FilesAdded { count: 2 }))
//!     .ok();
//! ```
//!
//! Emitting with no subscribers returns `Err`, which publishers ignore with
//! `.ok()`: nobody listening is not a failure of the operation.
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped (shutdown).

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Upload queue and batch execution
    Upload(UploadEvent),
    /// Local cache mutations
    Cache(CacheEvent),
    /// Remote reconciliation
    Sync(SyncEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Upload(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Upload(UploadEvent::JobFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Upload(UploadEvent::FileRejected { .. }) => EventSeverity::Warning,
            CoreEvent::Upload(UploadEvent::BatchSettled { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::Hydrated { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Upload Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// Files admitted to the queue by one `add_files` call.
    FilesAdded { count: usize },
    /// A candidate file failed admission.
    FileRejected {
        file_name: String,
        /// Rendered admission error
        reason: String,
    },
    FilesRemoved { count: usize },
    JobRenamed { upload_id: String, name: String },
    /// Jobs moved to `uploading` by one `upload_all` call.
    BatchStarted { job_count: usize },
    JobCompleted { upload_id: String, scan_id: String },
    JobFailed { upload_id: String, message: String },
    /// Every job of the batch reached `completed` or `failed`.
    BatchSettled { completed: usize, failed: usize },
    /// A completed job left the queue after its grace period.
    JobEvicted { upload_id: String },
    SessionStatsReset,
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::FilesAdded { .. } => "Files added to upload queue",
            UploadEvent::FileRejected { .. } => "File rejected",
            UploadEvent::FilesRemoved { .. } => "Files removed from upload queue",
            UploadEvent::JobRenamed { .. } => "Upload renamed",
            UploadEvent::BatchStarted { .. } => "Upload batch started",
            UploadEvent::JobCompleted { .. } => "Upload completed",
            UploadEvent::JobFailed { .. } => "Upload failed",
            UploadEvent::BatchSettled { .. } => "Upload batch settled",
            UploadEvent::JobEvicted { .. } => "Completed upload removed from queue",
            UploadEvent::SessionStatsReset => "Session statistics reset",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// Persisted snapshot loaded into memory.
    Hydrated { scan_count: usize },
    /// Contents replaced wholesale (sync).
    Replaced { scan_count: usize },
    ScanAdded { scan_id: String },
    ScanUpdated { scan_id: String },
    /// Bulk status or metadata change.
    ScansUpdated { scan_ids: Vec<String> },
    ScansRemoved { scan_ids: Vec<String> },
    Cleared,
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Hydrated { .. } => "Local cache hydrated",
            CacheEvent::Replaced { .. } => "Local cache replaced",
            CacheEvent::ScanAdded { .. } => "Scan added to cache",
            CacheEvent::ScanUpdated { .. } => "Cached scan updated",
            CacheEvent::ScansUpdated { .. } => "Cached scans updated",
            CacheEvent::ScansRemoved { .. } => "Scans removed from cache",
            CacheEvent::Cleared => "Local cache cleared",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    Started,
    Completed {
        scan_count: usize,
        /// Unix epoch milliseconds
        synced_at: i64,
    },
    Failed {
        message: String,
        /// Whether a later `sync_scans` may succeed
        recoverable: bool,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started => "Sync started",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is the per-subscriber backlog before `Lagged` is reported.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event; returns how many subscribers received it.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe through an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus};
///
/// let event_bus = EventBus::new(100);
/// let sync_only = event_bus
///     .stream()
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next event passing the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
