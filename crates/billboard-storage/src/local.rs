use crate::traits::{FileSystem, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local disk implementation of the filesystem capability
#[derive(Clone, Debug, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        LocalFileSystem
    }

    /// Sibling path used while a file is being replaced
    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    fn is_available(&self) -> bool {
        true
    }

    async fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create directory {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        Ok(fs::try_exists(path).await.unwrap_or(false))
    }

    async fn size(&self, path: &Path) -> StorageResult<u64> {
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn copy(&self, from: &Path, to: &Path) -> StorageResult<u64> {
        self.ensure_parent_dir(to).await?;
        let start = std::time::Instant::now();
        let copy_failed = |e: std::io::Error| {
            StorageError::CopyFailed(format!(
                "Failed to copy {} to {}: {}",
                from.display(),
                to.display(),
                e
            ))
        };

        let mut source = fs::File::open(from).await.map_err(copy_failed)?;
        let mut dest = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(to)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(to.display().to_string()));
            }
            Err(e) => return Err(copy_failed(e)),
        };

        let copied = async {
            let bytes = tokio::io::copy(&mut source, &mut dest).await?;
            dest.sync_all().await?;
            Ok::<_, std::io::Error>(bytes)
        }
        .await;
        drop(dest);

        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(to).await;
                return Err(copy_failed(e));
            }
        };

        tracing::debug!(
            from = %from.display(),
            to = %to.display(),
            size_bytes = bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local file copy successful"
        );

        Ok(bytes)
    }

    async fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write(&self, path: &Path, data: Vec<u8>) -> StorageResult<()> {
        self.ensure_parent_dir(path).await?;
        let tmp = Self::temp_path(path);

        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", tmp.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", tmp.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", tmp.display(), e))
        })?;
        drop(file);

        fs::rename(&tmp, path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }

    async fn remove(&self, path: &Path) -> StorageResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_replaces_contents_without_leaving_temp_file() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let path = dir.path().join("nested").join("index.json");

        fs.write(&path, b"[]".to_vec()).await.unwrap();
        fs.write(&path, b"[1]".to_vec()).await.unwrap();

        assert_eq!(fs.read(&path).await.unwrap(), b"[1]");
        assert!(!fs.exists(&LocalFileSystem::temp_path(&path)).await.unwrap());
    }

    #[tokio::test]
    async fn copy_reports_size() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let src = dir.path().join("a.mp4");
        tokio::fs::write(&src, vec![7u8; 64]).await.unwrap();

        let dst = dir.path().join("videos").join("b.mp4");
        assert_eq!(fs.copy(&src, &dst).await.unwrap(), 64);
        assert_eq!(fs.size(&dst).await.unwrap(), 64);
    }

    #[tokio::test]
    async fn copy_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let src = dir.path().join("a.mp4");
        tokio::fs::write(&src, vec![7u8; 64]).await.unwrap();
        let dst = dir.path().join("b.mp4");
        tokio::fs::write(&dst, b"first").await.unwrap();

        assert!(matches!(
            fs.copy(&src, &dst).await,
            Err(StorageError::AlreadyExists(_))
        ));
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn missing_files() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        let missing = dir.path().join("missing.mp4");

        assert!(!fs.exists(&missing).await.unwrap());
        assert!(matches!(
            fs.size(&missing).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            fs.read(&missing).await,
            Err(StorageError::NotFound(_))
        ));
        fs.remove(&missing).await.unwrap();
    }
}
