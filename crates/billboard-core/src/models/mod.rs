//! Domain models of the moderation pipeline.

pub mod booking;
pub mod moderation;
pub mod video;

pub use booking::{
    BookingDetails, BookingStatus, BookingType, BookingUpdate, ContentModerationStatus,
    ContentModerationUpdate, UserDetails,
};
pub use moderation::{
    AnalysisResult, Category, CategoryScores, DecisionStatus, ModerationDecision,
    ModerationResult, QuickCheck, Thresholds,
};
pub use video::{StorageStats, StoredVideo, VideoRecord, VideoStatus};
