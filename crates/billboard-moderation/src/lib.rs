//! Billboard Moderation Library
//!
//! The video moderation pipeline: frame extraction, the three-track analysis
//! engine, the orchestrator that renders decisions and fires notifications,
//! the observable session used by UIs, and booking-status synchronization.
//!
//! ```text
//! ModerationSession::analyze_video
//!   -> ModerationOrchestrator::moderate_video
//!     -> AnalysisEngine::analyze (visual | audio | text)
//!     -> decision
//!     -> notifications + BookingStatusSynchronizer (background)
//! ```

pub mod analysis;
pub mod frames;
pub mod notify;
pub mod orchestrator;
pub mod session;
pub mod sync;

pub use analysis::{AnalysisEngine, TrackOutcome};
pub use frames::{FfmpegFrameExtractor, Frame, FrameExtractor, MediaClip, SampledFrameExtractor};
pub use notify::{create_notifier, EmailNotifier, LogNotifier, NotificationContent, Notifier};
pub use orchestrator::{render_decision, ModerationOrchestrator, Moderator};
pub use session::{ModerationSession, ModerationSessionState, SessionStatus};
pub use sync::{BookingStatusSynchronizer, SyncOutcome};
