use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use super::moderation::ModerationResult;

/// Lifecycle of a stored video: `uploaded -> analyzing -> approved | rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploaded,
    Analyzing,
    Approved,
    Rejected,
}

impl VideoStatus {
    /// Approved and rejected records never move again.
    pub fn is_terminal(self) -> bool {
        matches!(self, VideoStatus::Approved | VideoStatus::Rejected)
    }

    /// Whether moving from `self` to `next` follows the forward-only lifecycle.
    pub fn can_transition_to(self, next: VideoStatus) -> bool {
        use VideoStatus::*;
        match (self, next) {
            (Uploaded, Analyzing) | (Uploaded, Approved) | (Uploaded, Rejected) => true,
            (Analyzing, Approved) | (Analyzing, Rejected) => true,
            (current, next) => current == next && !current.is_terminal(),
        }
    }
}

impl Display for VideoStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VideoStatus::Uploaded => write!(f, "uploaded"),
            VideoStatus::Analyzing => write!(f, "analyzing"),
            VideoStatus::Approved => write!(f, "approved"),
            VideoStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for VideoStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploaded" => Ok(VideoStatus::Uploaded),
            "analyzing" => Ok(VideoStatus::Analyzing),
            "approved" => Ok(VideoStatus::Approved),
            "rejected" => Ok(VideoStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid video status: {}", s)),
        }
    }
}

/// One stored video and its moderation bookkeeping, as persisted in the
/// metadata index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: Uuid,
    pub original_name: String,
    pub file_name: String,
    pub local_path: PathBuf,
    pub file_size: u64,
    pub upload_date: DateTime<Utc>,
    pub user_id: String,
    pub booking_id: String,
    pub status: VideoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_result: Option<ModerationResult>,
}

/// Identifying information returned by a successful store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVideo {
    pub id: Uuid,
    pub local_path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
}

impl From<&VideoRecord> for StoredVideo {
    fn from(record: &VideoRecord) -> Self {
        StoredVideo {
            id: record.id,
            local_path: record.local_path.clone(),
            file_name: record.file_name.clone(),
            file_size: record.file_size,
        }
    }
}

/// Aggregate counters over the metadata index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_videos: usize,
    pub total_size: u64,
    pub approved_videos: usize,
    pub rejected_videos: usize,
    /// Both `uploaded` and `analyzing` records.
    pub pending_videos: usize,
}

impl StorageStats {
    pub fn from_records(records: &[VideoRecord]) -> Self {
        records.iter().fold(StorageStats::default(), |mut stats, record| {
            stats.total_videos += 1;
            stats.total_size += record.file_size;
            match record.status {
                VideoStatus::Approved => stats.approved_videos += 1,
                VideoStatus::Rejected => stats.rejected_videos += 1,
                VideoStatus::Uploaded | VideoStatus::Analyzing => stats.pending_videos += 1,
            }
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: VideoStatus, size: u64) -> VideoRecord {
        VideoRecord {
            id: Uuid::new_v4(),
            original_name: "ad.mp4".to_string(),
            file_name: "b1_1700000000000.mp4".to_string(),
            local_path: PathBuf::from("/tmp/videos/b1_1700000000000.mp4"),
            file_size: size,
            upload_date: Utc::now(),
            user_id: "u1".to_string(),
            booking_id: "b1".to_string(),
            status,
            moderation_result: None,
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&VideoStatus::Analyzing).unwrap(),
            "\"analyzing\""
        );
        assert_eq!("APPROVED".parse::<VideoStatus>().unwrap(), VideoStatus::Approved);
        assert!("deleted".parse::<VideoStatus>().is_err());
    }

    #[test]
    fn terminal_statuses_do_not_transition() {
        assert!(VideoStatus::Uploaded.can_transition_to(VideoStatus::Analyzing));
        assert!(VideoStatus::Analyzing.can_transition_to(VideoStatus::Rejected));
        assert!(!VideoStatus::Approved.can_transition_to(VideoStatus::Rejected));
        assert!(!VideoStatus::Rejected.can_transition_to(VideoStatus::Rejected));
        assert!(!VideoStatus::Analyzing.can_transition_to(VideoStatus::Uploaded));
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let value = serde_json::to_value(record(VideoStatus::Uploaded, 10)).unwrap();
        assert!(value.get("originalName").is_some());
        assert!(value.get("bookingId").is_some());
        assert!(value.get("uploadDate").is_some());
        assert!(value.get("moderationResult").is_none());
    }

    #[test]
    fn stats_partition_every_record() {
        let records = vec![
            record(VideoStatus::Uploaded, 1),
            record(VideoStatus::Analyzing, 2),
            record(VideoStatus::Approved, 3),
            record(VideoStatus::Rejected, 4),
            record(VideoStatus::Approved, 5),
        ];
        let stats = StorageStats::from_records(&records);
        assert_eq!(stats.total_videos, 5);
        assert_eq!(stats.total_size, 15);
        assert_eq!(stats.approved_videos, 2);
        assert_eq!(stats.rejected_videos, 1);
        assert_eq!(stats.pending_videos, 2);
        assert_eq!(
            stats.total_videos,
            stats.approved_videos + stats.rejected_videos + stats.pending_videos
        );
    }
}
