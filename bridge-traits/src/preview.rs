//! Local files picked by the user and the preview resources derived from them.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// A file handed to the pipeline by the host file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    /// Size as reported by the host. Admission checks use this value.
    pub size_bytes: u64,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: data.len() as u64,
            data,
        }
    }

    /// Override the reported size, e.g. when the host streams lazily.
    pub fn with_declared_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }
}

/// Creates and releases displayable previews for local files.
///
/// Every locator returned by `acquire` is passed to `release` exactly once
/// by the upload queue.
///
/// `acquire` may do I/O and runs on the async runtime. `release` is
/// synchronous because it is called from `Drop`; keep it cheap.
#[async_trait]
pub trait PreviewProvider: Send + Sync {
    async fn acquire(&self, file: &LocalFile) -> Result<String>;
    fn release(&self, locator: &str);
}
