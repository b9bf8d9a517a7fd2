//! Local video store
//!
//! Owns the video binaries and the JSON metadata index. Read views never fail:
//! a missing, unreadable or corrupt index reads as empty and is logged.
//! Mutations run their read-modify-write cycle under an in-process lock, so
//! concurrent calls on one store cannot lose each other's updates.

use billboard_core::models::{ModerationResult, StorageStats, StoredVideo, VideoRecord, VideoStatus};
use billboard_core::ModerationConfig;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::keys::generate_video_file_name;
use crate::traits::{FileSystem, StorageError, StorageResult};
use crate::validation::{
    file_extension, validate_booking_id, validate_extension, validate_size, StoreVideoError,
};

/// Name collisions tolerated before a store is given up
const MAX_NAME_ATTEMPTS: i64 = 16;

/// Limits applied to submitted videos
#[derive(Clone, Debug)]
pub struct StoreLimits {
    pub max_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl Default for StoreLimits {
    fn default() -> Self {
        StoreLimits {
            max_size_bytes: billboard_core::constants::MAX_VIDEO_SIZE_BYTES,
            allowed_extensions: billboard_core::constants::DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Caller-facing shape of a store attempt: identifying info on success, the
/// validation message otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreVideoResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<StoredVideo, StoreVideoError>> for StoreVideoResponse {
    fn from(result: Result<StoredVideo, StoreVideoError>) -> Self {
        match result {
            Ok(stored) => StoreVideoResponse {
                success: true,
                id: Some(stored.id),
                local_path: Some(stored.local_path),
                file_name: Some(stored.file_name),
                file_size: Some(stored.file_size),
                error: None,
            },
            Err(err) => StoreVideoResponse {
                success: false,
                id: None,
                local_path: None,
                file_name: None,
                file_size: None,
                error: Some(err.to_string()),
            },
        }
    }
}

pub struct LocalVideoStore {
    fs: Arc<dyn FileSystem>,
    videos_dir: PathBuf,
    metadata_path: PathBuf,
    limits: StoreLimits,
    index_lock: Mutex<()>,
}

impl LocalVideoStore {
    /// Create a store rooted at `root` (videos in `{root}/videos`, index at
    /// `{root}/video_metadata.json`). Relative roots are resolved against the
    /// working directory so recorded paths are absolute.
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_relative() {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        } else {
            root
        };

        LocalVideoStore {
            fs,
            videos_dir: root.join(billboard_core::constants::VIDEOS_DIR),
            metadata_path: root.join(billboard_core::constants::METADATA_FILE),
            limits: StoreLimits::default(),
            index_lock: Mutex::new(()),
        }
    }

    pub fn with_limits(mut self, limits: StoreLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn from_config(config: &ModerationConfig, fs: Arc<dyn FileSystem>) -> Self {
        LocalVideoStore::new(fs, config.storage_root.clone()).with_limits(StoreLimits {
            max_size_bytes: config.max_video_size_bytes,
            allowed_extensions: config.video_allowed_extensions.clone(),
        })
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Create the videos directory and an empty index if needed.
    ///
    /// Best-effort: failures are logged and the store stays usable.
    pub async fn init(&self) {
        if !self.fs.is_available() {
            tracing::warn!("Video storage unavailable on this platform; storage operations are no-ops");
            return;
        }

        if let Err(e) = self.fs.create_dir_all(&self.videos_dir).await {
            tracing::error!(
                error = %e,
                path = %self.videos_dir.display(),
                "Failed to create videos directory"
            );
            return;
        }

        match self.fs.exists(&self.metadata_path).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self.fs.write(&self.metadata_path, b"[]".to_vec()).await {
                    tracing::error!(
                        error = %e,
                        path = %self.metadata_path.display(),
                        "Failed to create metadata index"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to check metadata index");
            }
        }

        tracing::info!(
            videos_dir = %self.videos_dir.display(),
            metadata = %self.metadata_path.display(),
            "Video storage initialized"
        );
    }

    async fn load_index(&self) -> StorageResult<Vec<VideoRecord>> {
        let data = match self.fs.read(&self.metadata_path).await {
            Ok(data) => data,
            Err(StorageError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        if data.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&data).map_err(|e| StorageError::CorruptIndex(e.to_string()))
    }

    async fn write_index(&self, records: &[VideoRecord]) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(records)
            .map_err(|e| StorageError::WriteFailed(format!("Failed to encode index: {}", e)))?;
        self.fs.write(&self.metadata_path, data).await
    }

    /// Validate `source`, copy it into the videos directory and append an
    /// `uploaded` record. On success both the copy and the index entry are
    /// durable.
    pub async fn store_video(
        &self,
        source: &Path,
        user_id: &str,
        booking_id: &str,
        original_name: Option<&str>,
    ) -> Result<StoredVideo, StoreVideoError> {
        if !self.fs.is_available() {
            tracing::warn!(booking_id = %booking_id, "Video storage unavailable, not storing video");
            return Err(StoreVideoError::Unavailable);
        }

        validate_booking_id(booking_id)?;

        if !self.fs.exists(source).await? {
            return Err(StoreVideoError::SourceMissing(source.display().to_string()));
        }

        let source_size = self.fs.size(source).await?;
        validate_size(source_size, self.limits.max_size_bytes)?;

        let source_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let original_name = original_name
            .map(str::to_string)
            .unwrap_or_else(|| source_name.clone());
        // A display name without an extension falls back to the source path's.
        let extension_source = if file_extension(&original_name).is_some() {
            &original_name
        } else {
            &source_name
        };
        let extension = validate_extension(extension_source, &self.limits.allowed_extensions)?;

        let start = std::time::Instant::now();
        self.fs.create_dir_all(&self.videos_dir).await?;

        // Two uploads for one booking within the same millisecond would share a
        // name; the copy refuses to overwrite, so step the stamp forward.
        let now = Utc::now();
        let mut attempt = 0;
        let (file_name, local_path, copied) = loop {
            let stamp = now + Duration::milliseconds(attempt);
            let file_name = generate_video_file_name(booking_id, &extension, stamp);
            let local_path = self.videos_dir.join(&file_name);
            match self.fs.copy(source, &local_path).await {
                Ok(copied) => break (file_name, local_path, copied),
                Err(StorageError::AlreadyExists(path)) if attempt < MAX_NAME_ATTEMPTS => {
                    tracing::debug!(path = %path, "Video file name taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        let file_size = self.fs.size(&local_path).await.unwrap_or(copied);

        let record = VideoRecord {
            id: Uuid::new_v4(),
            original_name,
            file_name,
            local_path: local_path.clone(),
            file_size,
            upload_date: now,
            user_id: user_id.to_string(),
            booking_id: booking_id.to_string(),
            status: VideoStatus::Uploaded,
            moderation_result: None,
        };

        let appended = {
            let _guard = self.index_lock.lock().await;
            match self.load_index().await {
                Ok(mut records) => {
                    records.push(record.clone());
                    self.write_index(&records).await
                }
                Err(e) => Err(e),
            }
        };

        if let Err(e) = appended {
            tracing::error!(
                error = %e,
                booking_id = %record.booking_id,
                "Failed to record stored video, removing copied file"
            );
            if let Err(cleanup) = self.fs.remove(&local_path).await {
                tracing::warn!(error = %cleanup, path = %local_path.display(), "Failed to remove orphaned video");
            }
            return Err(e.into());
        }

        tracing::info!(
            video_id = %record.id,
            booking_id = %record.booking_id,
            user_id = %record.user_id,
            path = %local_path.display(),
            size_bytes = file_size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video stored"
        );

        Ok(StoredVideo::from(&record))
    }

    /// `store_video` projected onto the `{success, ...}` response shape.
    pub async fn store_video_response(
        &self,
        source: &Path,
        user_id: &str,
        booking_id: &str,
        original_name: Option<&str>,
    ) -> StoreVideoResponse {
        let result = self
            .store_video(source, user_id, booking_id, original_name)
            .await;
        if let Err(ref e) = result {
            tracing::warn!(error = %e, booking_id = %booking_id, "Video store rejected");
        }
        result.into()
    }

    /// Every record in the index; empty on any read or parse failure.
    pub async fn get_all_videos(&self) -> Vec<VideoRecord> {
        match self.load_index().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %self.metadata_path.display(),
                    "Failed to read video metadata index"
                );
                Vec::new()
            }
        }
    }

    pub async fn get_videos_by_user(&self, user_id: &str) -> Vec<VideoRecord> {
        self.get_all_videos()
            .await
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect()
    }

    /// The record for a booking. With duplicates the most recent upload wins.
    pub async fn get_video_by_booking(&self, booking_id: &str) -> Option<VideoRecord> {
        self.get_all_videos()
            .await
            .into_iter()
            .filter(|r| r.booking_id == booking_id)
            .max_by_key(|r| r.upload_date)
    }

    pub async fn get_video(&self, id: Uuid) -> Option<VideoRecord> {
        self.get_all_videos().await.into_iter().find(|r| r.id == id)
    }

    /// Set a record's status, and its moderation result when given.
    ///
    /// Returns `Ok(false)` when no record has this id.
    pub async fn update_video_status(
        &self,
        id: Uuid,
        status: VideoStatus,
        moderation_result: Option<ModerationResult>,
    ) -> StorageResult<bool> {
        let _guard = self.index_lock.lock().await;
        let mut records = self.load_index().await?;

        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            tracing::debug!(video_id = %id, "Status update for unknown video ignored");
            return Ok(false);
        };

        if !record.status.can_transition_to(status) {
            tracing::warn!(
                video_id = %id,
                from = %record.status,
                to = %status,
                "Video status moved outside the normal lifecycle"
            );
        }

        record.status = status;
        if let Some(result) = moderation_result {
            record.moderation_result = Some(result);
        }

        self.write_index(&records).await?;

        tracing::info!(video_id = %id, status = %status, "Video status updated");
        Ok(true)
    }

    /// Delete a record and its binary. Returns whether a record was removed.
    pub async fn delete_video(&self, id: Uuid) -> bool {
        let _guard = self.index_lock.lock().await;

        let mut records = match self.load_index().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, video_id = %id, "Failed to load index for delete");
                return false;
            }
        };

        let Some(pos) = records.iter().position(|r| r.id == id) else {
            return false;
        };
        let record = records.remove(pos);

        if let Err(e) = self.write_index(&records).await {
            tracing::error!(error = %e, video_id = %id, "Failed to write index after delete");
            return false;
        }

        if let Err(e) = self.fs.remove(&record.local_path).await {
            tracing::warn!(
                error = %e,
                path = %record.local_path.display(),
                "Failed to delete video file"
            );
        }

        tracing::info!(video_id = %id, booking_id = %record.booking_id, "Video deleted");
        true
    }

    /// Delete every record uploaded more than `days_old` days ago.
    pub async fn cleanup_old_videos(&self, days_old: u32) -> usize {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));
        let _guard = self.index_lock.lock().await;

        let records = match self.load_index().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load index for cleanup");
                return 0;
            }
        };

        let (expired, kept): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.upload_date < cutoff);

        if expired.is_empty() {
            return 0;
        }

        if let Err(e) = self.write_index(&kept).await {
            tracing::error!(error = %e, "Failed to write index after cleanup");
            return 0;
        }

        for record in &expired {
            if let Err(e) = self.fs.remove(&record.local_path).await {
                tracing::warn!(
                    error = %e,
                    path = %record.local_path.display(),
                    "Failed to delete expired video file"
                );
            }
        }

        tracing::info!(
            deleted = expired.len(),
            remaining = kept.len(),
            days_old = days_old,
            "Old videos cleaned up"
        );
        expired.len()
    }

    pub async fn get_storage_stats(&self) -> StorageStats {
        StorageStats::from_records(&self.get_all_videos().await)
    }

    /// Local path of an approved video whose file still exists.
    pub async fn get_video_for_playback(&self, id: Uuid) -> Option<PathBuf> {
        let record = self.get_video(id).await?;
        if record.status != VideoStatus::Approved {
            return None;
        }

        match self.fs.exists(&record.local_path).await {
            Ok(true) => Some(record.local_path),
            Ok(false) => {
                tracing::warn!(
                    video_id = %id,
                    path = %record.local_path.display(),
                    "Approved video missing on disk"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, video_id = %id, "Failed to check video file");
                None
            }
        }
    }
}
