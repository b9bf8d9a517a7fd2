//! Filesystem backend for platforms without durable storage.
//!
//! Every mutation is skipped with a warning and every lookup reports nothing,
//! so callers see "video not found" rather than an error.

use crate::traits::{FileSystem, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct UnavailableFileSystem;

#[async_trait]
impl FileSystem for UnavailableFileSystem {
    fn is_available(&self) -> bool {
        false
    }

    async fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        tracing::warn!(path = %path.display(), "Filesystem unavailable, skipping directory creation");
        Ok(())
    }

    async fn exists(&self, _path: &Path) -> StorageResult<bool> {
        Ok(false)
    }

    async fn size(&self, path: &Path) -> StorageResult<u64> {
        Err(StorageError::NotFound(path.display().to_string()))
    }

    async fn copy(&self, _from: &Path, _to: &Path) -> StorageResult<u64> {
        Err(StorageError::Unavailable)
    }

    async fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(path.display().to_string()))
    }

    async fn write(&self, path: &Path, _data: Vec<u8>) -> StorageResult<()> {
        tracing::warn!(path = %path.display(), "Filesystem unavailable, skipping write");
        Ok(())
    }

    async fn remove(&self, _path: &Path) -> StorageResult<()> {
        Ok(())
    }
}
