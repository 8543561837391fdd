//! Remote scan service contract.
//!
//! The pipeline talks to the backend only through [`RemoteScanService`]:
//! multipart upload of one file, listing the user's scans, and deleting one
//! by its storage location. Authentication and transport live in the host
//! implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// HTTP status the backend returns when an upload created a record.
pub const UPLOAD_CREATED_STATUS: u16 = 201;

/// A scan record as the backend reports it.
///
/// `status` is carried as the raw wire string; the cache layer maps it onto
/// its own status enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteScan {
    pub id: String,
    pub user_identifier: String,
    pub name: String,
    /// Storage location (blob URL) of the uploaded file
    pub remote_location: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub status: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Result of a single upload call that reached the backend.
///
/// Transport failures surface as `Err(BridgeError)` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The backend answered with a record.
    Stored { status: u16, record: RemoteScan },
    /// The backend answered without a record.
    Rejected { status: u16, error: Option<String> },
}

impl UploadOutcome {
    /// The created record, if the backend answered `201` with a body.
    pub fn created_record(self) -> std::result::Result<RemoteScan, String> {
        match self {
            UploadOutcome::Stored { status, record } if status == UPLOAD_CREATED_STATUS => {
                Ok(record)
            }
            UploadOutcome::Stored { status, .. } => {
                Err(format!("Upload failed with status {status}"))
            }
            UploadOutcome::Rejected {
                error: Some(error), ..
            } => Err(error),
            UploadOutcome::Rejected { status, error: None } => {
                Err(format!("Upload failed with status {status}"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl DeleteOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Backend operations the pipeline depends on.
///
/// # Example
///
/// ```ignore
/// let outcome = service.upload(bytes, "receipt.jpg", "image/jpeg").await?;
/// let record = outcome.created_record()?;
/// ```
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait RemoteScanService: Send + Sync {
    /// Upload one file's bytes as multipart form data.
    async fn upload(&self, payload: Bytes, file_name: &str, mime_type: &str)
        -> Result<UploadOutcome>;

    /// List the signed-in user's scans. Archived scans are omitted unless
    /// `include_archived` is set.
    async fn fetch(&self, include_archived: bool) -> Result<Vec<RemoteScan>>;

    /// Delete a scan by its storage location.
    async fn delete(&self, remote_location: &str) -> Result<DeleteOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RemoteScan {
        RemoteScan {
            id: "scan-1".to_string(),
            user_identifier: "user-1".to_string(),
            name: "receipt.jpg".to_string(),
            remote_location: "https://blob.example/scan-1".to_string(),
            mime_type: "image/jpeg".to_string(),
            size_bytes: 1024,
            status: "READY".to_string(),
            uploaded_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_created_record_requires_201() {
        let created = UploadOutcome::Stored {
            status: 201,
            record: record(),
        };
        assert_eq!(created.created_record().unwrap().id, "scan-1");

        let ok_but_not_created = UploadOutcome::Stored {
            status: 200,
            record: record(),
        };
        assert_eq!(
            ok_but_not_created.created_record().unwrap_err(),
            "Upload failed with status 200"
        );
    }

    #[test]
    fn test_rejected_prefers_backend_message() {
        let with_message = UploadOutcome::Rejected {
            status: 413,
            error: Some("Payload too large".to_string()),
        };
        assert_eq!(with_message.created_record().unwrap_err(), "Payload too large");

        let bare = UploadOutcome::Rejected {
            status: 500,
            error: None,
        };
        assert_eq!(bare.created_record().unwrap_err(), "Upload failed with status 500");
    }

    #[test]
    fn test_remote_scan_metadata_defaults_when_absent() {
        let json = serde_json::json!({
            "id": "scan-2",
            "user_identifier": "user-1",
            "name": "doc.pdf",
            "remote_location": "https://blob.example/scan-2",
            "mime_type": "application/pdf",
            "size_bytes": 2048,
            "status": "PROCESSING",
            "uploaded_at": "2024-01-15T10:30:00Z"
        });
        let scan: RemoteScan = serde_json::from_value(json).unwrap();
        assert!(scan.metadata.is_empty());
        assert_eq!(scan.status, "PROCESSING");
    }

    #[core_async::test]
    async fn test_mock_remote_service_fetch() {
        let mut mock = MockRemoteScanService::new();
        mock.expect_fetch()
            .withf(|include_archived| !*include_archived)
            .times(1)
            .returning(|_| Ok(vec![record()]));

        let scans = mock.fetch(false).await.unwrap();
        assert_eq!(scans.len(), 1);
    }
}
