use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Scan {scan_id} not found")]
    ScanNotFound { scan_id: String },
}

pub type Result<T> = std::result::Result<T, SyncError>;
