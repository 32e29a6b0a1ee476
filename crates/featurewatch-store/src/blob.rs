//! Filesystem-backed [`BlobStore`] implementation.
//!
//! Wraps the synchronous [`crate::cas::FsStore`] behind
//! `tokio::task::spawn_blocking`, since content-addressed filesystem I/O is
//! blocking and every suspension point in the engine is expected to be an
//! `async fn`.

use crate::cas::FsStore;
use async_trait::async_trait;
use featurewatch_errors::{FwError, FwErrorKind};
use featurewatch_transport::contracts::BlobStore;
use std::sync::Arc;

/// [`BlobStore`] backed by a local directory, content-addressed per
/// `featurewatch-store::cas`.
pub struct FsBlobStore {
    inner: Arc<FsStore>,
}

impl FsBlobStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            inner: Arc::new(FsStore::new(root)),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(&self, dir: &str, bytes: &[u8]) -> Result<(String, String), FwError> {
        let inner = self.inner.clone();
        let dir = dir.to_string();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || inner.write(&dir, &bytes))
            .await
            .map_err(|e| {
                FwError::new(FwErrorKind::Internal)
                    .with_op("blob_store.store")
                    .with_message(format!("blocking task panicked: {}", e))
            })?
    }

    async fn get(&self, full_path: &str) -> Result<Vec<u8>, FwError> {
        let inner = self.inner.clone();
        let full_path = full_path.to_string();
        tokio::task::spawn_blocking(move || inner.read(&full_path))
            .await
            .map_err(|e| {
                FwError::new(FwErrorKind::Internal)
                    .with_op("blob_store.get")
                    .with_message(format!("blocking task panicked: {}", e))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        let (digest, path) = store.store("state", b"snapshot bytes").await.unwrap();
        assert_eq!(digest.len(), 64);
        let back = store.get(&path).await.unwrap();
        assert_eq!(back, b"snapshot bytes");
    }
}
