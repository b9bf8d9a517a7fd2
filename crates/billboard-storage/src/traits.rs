//! Filesystem capability trait
//!
//! The video store never touches `std::fs`/`tokio::fs` directly. It depends on
//! this trait so that a platform without a durable filesystem can plug in a
//! backend whose operations are skipped.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Filesystem operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Metadata index is corrupt: {0}")]
    CorruptIndex(String),

    #[error("Filesystem is not available on this platform")]
    Unavailable,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for filesystem operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for billboard_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => billboard_core::AppError::NotFound(path),
            StorageError::Unavailable => billboard_core::AppError::StorageUnavailable,
            StorageError::ConfigError(msg) => billboard_core::AppError::Config(msg),
            other => billboard_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Filesystem capability used by the video store.
///
/// Paths are absolute (or relative to the process working directory); the
/// store decides where things live.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Whether this backend persists anything at all
    fn is_available(&self) -> bool;

    /// Create a directory and all of its parents
    async fn create_dir_all(&self, path: &Path) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, path: &Path) -> StorageResult<bool>;

    /// Size in bytes of an existing file
    async fn size(&self, path: &Path) -> StorageResult<u64>;

    /// Copy `from` to a new file `to`, returning the number of bytes written.
    ///
    /// Never overwrites: fails with `AlreadyExists` when `to` is taken.
    async fn copy(&self, from: &Path, to: &Path) -> StorageResult<u64>;

    /// Read a whole file
    async fn read(&self, path: &Path) -> StorageResult<Vec<u8>>;

    /// Replace the contents of `path`.
    ///
    /// Readers must never observe a partially written file.
    async fn write(&self, path: &Path, data: Vec<u8>) -> StorageResult<()>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn remove(&self, path: &Path) -> StorageResult<()>;
}
