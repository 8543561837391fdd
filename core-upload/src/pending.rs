//! Queued upload jobs.

use std::fmt;

use bridge_traits::LocalFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::preview::PreviewHandle;

/// Type-safe upload job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Idle,
    Uploading,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Idle => "idle",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    /// Picked up by the next `upload_all`.
    pub fn is_eligible(&self) -> bool {
        matches!(self, UploadStatus::Idle | UploadStatus::Failed)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a queued job handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingUpload {
    pub id: UploadId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub preview_locator: String,
    pub status: UploadStatus,
    pub error: Option<String>,
}

/// Queue-owned job. Dropping it releases the preview.
#[derive(Debug)]
pub(crate) struct QueuedUpload {
    pub id: UploadId,
    pub name: String,
    pub file: LocalFile,
    pub preview: PreviewHandle,
    pub status: UploadStatus,
    pub error: Option<String>,
}

impl QueuedUpload {
    pub fn new(file: LocalFile, preview: PreviewHandle) -> Self {
        Self {
            id: UploadId::new(),
            name: file.name.clone(),
            file,
            preview,
            status: UploadStatus::Idle,
            error: None,
        }
    }

    pub fn view(&self) -> PendingUpload {
        PendingUpload {
            id: self.id,
            name: self.name.clone(),
            mime_type: self.file.mime_type.clone(),
            size_bytes: self.file.size_bytes,
            preview_locator: self.preview.locator().to_string(),
            status: self.status,
            error: self.error.clone(),
        }
    }
}

/// What the executor needs to run one job, captured when the batch starts.
#[derive(Debug, Clone)]
pub(crate) struct UploadTicket {
    pub id: UploadId,
    pub name: String,
    pub file: LocalFile,
}
