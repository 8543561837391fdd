use thiserror::Error;

use crate::pending::UploadId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload not found: {0}")]
    NotFound(UploadId),

    #[error("Cannot rename {0} while it is uploading")]
    RenameWhileUploading(UploadId),

    #[error("Invalid name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;
