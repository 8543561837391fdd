//! Preview provider writing each file to a temp location on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    preview::{LocalFile, PreviewProvider},
};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Materialises previews as files under a cache directory. The locator is
/// the absolute path; releasing deletes the file.
pub struct TempFilePreviewProvider {
    preview_dir: PathBuf,
}

impl TempFilePreviewProvider {
    /// Use `<user cache dir>/scan-pipeline/previews`.
    pub fn new() -> Self {
        let preview_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scan-pipeline")
            .join("previews");

        Self { preview_dir }
    }

    pub fn with_directory(preview_dir: PathBuf) -> Self {
        Self { preview_dir }
    }

    pub fn directory(&self) -> &Path {
        &self.preview_dir
    }

    fn extension_for(file: &LocalFile) -> &str {
        Path::new(&file.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin")
    }
}

impl Default for TempFilePreviewProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreviewProvider for TempFilePreviewProvider {
    async fn acquire(&self, file: &LocalFile) -> Result<String> {
        if !fs::try_exists(&self.preview_dir).await.unwrap_or(false) {
            fs::create_dir_all(&self.preview_dir).await?;
            debug!(path = ?self.preview_dir, "Created preview directory");
        }

        let path = self
            .preview_dir
            .join(format!("{}.{}", Uuid::new_v4(), Self::extension_for(file)));
        fs::write(&path, &file.data).await?;

        let locator = path
            .to_str()
            .map(str::to_owned)
            .ok_or_else(|| BridgeError::OperationFailed("preview path is not UTF-8".to_string()))?;
        debug!(locator = %locator, size = file.data.len(), "Acquired preview");
        Ok(locator)
    }

    // Runs from `Drop`, so this stays a plain blocking call
    fn release(&self, locator: &str) {
        match std::fs::remove_file(locator) {
            Ok(()) => debug!(locator = %locator, "Released preview"),
            Err(e) => warn!(locator = %locator, error = %e, "Failed to release preview"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_writes_and_release_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TempFilePreviewProvider::with_directory(dir.path().join("previews"));
        let file = LocalFile::new("receipt.jpg", "image/jpeg", bytes::Bytes::from_static(b"jpeg"));

        let locator = provider.acquire(&file).await.unwrap();
        assert!(locator.ends_with(".jpg"));
        assert_eq!(fs::read(&locator).await.unwrap(), b"jpeg");

        provider.release(&locator);
        assert!(!Path::new(&locator).exists());
    }

    #[tokio::test]
    async fn test_each_acquire_gets_a_distinct_locator() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TempFilePreviewProvider::with_directory(dir.path().to_path_buf());
        let file = LocalFile::new("scan", "application/pdf", vec![1u8, 2, 3]);

        let first = provider.acquire(&file).await.unwrap();
        let second = provider.acquire(&file).await.unwrap();
        assert_ne!(first, second);
        assert!(first.ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_complete() {
        let dir = tempfile::tempdir().unwrap();
        let provider = std::sync::Arc::new(TempFilePreviewProvider::with_directory(
            dir.path().to_path_buf(),
        ));
        let file = LocalFile::new("big.png", "image/png", vec![7u8; 4 * 1024 * 1024]);

        // Several writes in flight on one runtime all complete
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let provider = provider.clone();
                let file = file.clone();
                tokio::spawn(async move { provider.acquire(&file).await })
            })
            .collect();

        for handle in handles {
            let locator = handle.await.unwrap().unwrap();
            assert_eq!(fs::metadata(&locator).await.unwrap().len(), 4 * 1024 * 1024);
        }
    }

    #[test]
    fn test_release_of_missing_file_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TempFilePreviewProvider::with_directory(dir.path().to_path_buf());
        provider.release(dir.path().join("gone.png").to_str().unwrap());
    }
}
