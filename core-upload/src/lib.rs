//! # Upload Pipeline
//!
//! Queues files picked by the user, uploads them to the remote scan service
//! and feeds the results into the local cache.
//!
//! ## Components
//!
//! - [`UploadQueue`]: admission, removal, renaming and clearing of jobs
//! - [`UploadExecutor`]: single-flight, all-settle batch execution
//! - [`SessionStatsTracker`]: session counters that outlive queue entries
//! - [`PreviewHandle`]: scoped preview resource released when a job leaves
//!   the queue
//!
//! ## Job lifecycle
//!
//! ```text
//! idle -> uploading -> completed -> (grace period) -> evicted
//!                   \-> failed -> uploading (next batch)
//! ```

pub mod error;
pub mod executor;
pub mod pending;
pub mod preview;
pub mod queue;
pub mod stats;

pub use error::{Result, UploadError};
pub use executor::{BatchResult, BatchSummary, UploadExecutor};
pub use pending::{PendingUpload, UploadId, UploadStatus};
pub use preview::PreviewHandle;
pub use queue::{AdmissionError, AdmissionReport, UploadQueue};
pub use stats::{SessionStats, SessionStatsTracker};
