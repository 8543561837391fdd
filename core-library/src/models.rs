//! Domain models for the local scan cache

use bridge_traits::RemoteScan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::LibraryError;

// =============================================================================
// Enumerations
// =============================================================================

/// Lifecycle status of a stored scan. Wire form is lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Uploading,
    Ready,
    Failed,
    Processing,
    Archived,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Uploading => "uploading",
            ScanStatus::Ready => "ready",
            ScanStatus::Failed => "failed",
            ScanStatus::Processing => "processing",
            ScanStatus::Archived => "archived",
        }
    }

    /// Lenient parse used for backend metadata: anything unrecognised is
    /// treated as `Ready`.
    pub fn from_remote(value: &str) -> Self {
        value.parse().unwrap_or(ScanStatus::Ready)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uploading" => Ok(ScanStatus::Uploading),
            "ready" => Ok(ScanStatus::Ready),
            "failed" => Ok(ScanStatus::Failed),
            "processing" => Ok(ScanStatus::Processing),
            "archived" => Ok(ScanStatus::Archived),
            _ => Err(LibraryError::InvalidInput {
                field: "status".to_string(),
                message: format!("unknown scan status '{}'", s),
            }),
        }
    }
}

/// File family of a scan, derived from its mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanType {
    Jpeg,
    Png,
    Pdf,
    Other,
}

impl ScanType {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => ScanType::Jpeg,
            "image/png" => ScanType::Png,
            "application/pdf" => ScanType::Pdf,
            _ => ScanType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Jpeg => "JPEG",
            ScanType::Png => "PNG",
            ScanType::Pdf => "PDF",
            ScanType::Other => "OTHER",
        }
    }
}

impl FromStr for ScanType {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JPEG" => Ok(ScanType::Jpeg),
            "PNG" => Ok(ScanType::Png),
            "PDF" => Ok(ScanType::Pdf),
            "OTHER" => Ok(ScanType::Other),
            _ => Err(LibraryError::InvalidInput {
                field: "scan_type".to_string(),
                message: format!("unknown scan type '{}'", s),
            }),
        }
    }
}

// =============================================================================
// Cached Scan
// =============================================================================

/// Local mirror of a remote scan record.
///
/// `cached_at` is stamped locally when the record enters the cache and is
/// never sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedScan {
    pub id: String,
    pub user_identifier: String,
    pub name: String,
    pub mime_type: String,
    pub scan_type: ScanType,
    pub status: ScanStatus,
    pub remote_location: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CachedScan {
    pub fn from_remote(remote: RemoteScan, cached_at: DateTime<Utc>) -> Self {
        Self {
            scan_type: ScanType::from_mime(&remote.mime_type),
            status: ScanStatus::from_remote(&remote.status),
            id: remote.id,
            user_identifier: remote.user_identifier,
            name: remote.name,
            mime_type: remote.mime_type,
            remote_location: remote.remote_location,
            size_bytes: remote.size_bytes,
            uploaded_at: remote.uploaded_at,
            cached_at,
            metadata: remote.metadata,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.status == ScanStatus::Ready
    }
}
