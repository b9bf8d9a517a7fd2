//! Fixed values of the moderation pipeline.

/// Default maximum size for stored videos (100 MB)
pub const MAX_VIDEO_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Video container extensions accepted by the store (compared lower-case)
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "m4v"];

/// Directory (under the storage root) holding video binaries
pub const VIDEOS_DIR: &str = "videos";

/// Metadata index file name (under the storage root)
pub const METADATA_FILE: &str = "video_metadata.json";

/// Weight of the visual track in the combined score
pub const VISUAL_WEIGHT: f64 = 0.4;
/// Weight of the audio track in the combined score
pub const AUDIO_WEIGHT: f64 = 0.4;
/// Weight of the on-screen text track in the combined score
pub const TEXT_WEIGHT: f64 = 0.2;

/// Harassment contribution of a toxic/negative text label, relative to its score
pub const TEXT_HARASSMENT_FACTOR: f64 = 0.8;

/// Minutes between approval and the estimated first play on a billboard
pub const PLAY_DELAY_MINUTES: i64 = 5;

/// Synthetic progress never passes this value before the analysis resolves
pub const SYNTHETIC_PROGRESS_CAP: u8 = 90;
/// Synthetic progress increment per tick
pub const SYNTHETIC_PROGRESS_STEP: u8 = 10;

pub const APPROVAL_REASON: &str = "Content approved - no policy violations detected";
pub const ANALYSIS_FAILED_REASON: &str = "Analysis failed - manual review required";
pub const OUTAGE_REASON: &str = "Moderation services unavailable - manual review required";

pub const APPROVED_MESSAGE: &str =
    "Your video has been approved and will be displayed on the billboard shortly.";
pub const PENDING_MESSAGE: &str =
    "Your video could not be verified automatically and has been queued for manual review.";
pub const ERROR_MESSAGE: &str = "Failed to analyze video. Please try again later.";
pub const SIMPLE_ERROR_REASON: &str = "Failed to analyze video content";
