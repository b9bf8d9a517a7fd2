//! Moderation orchestrator
//!
//! Public entry point of the pipeline: turns a video (plus optional user and
//! booking context) into a `ModerationDecision`. Notifications and booking
//! synchronization run as tracked background tasks and never delay or alter
//! the returned decision.

use async_trait::async_trait;
use billboard_api_client::{BookingApiClient, BookingBackend};
use billboard_classifiers::ClassifierSet;
use billboard_core::constants::{
    APPROVED_MESSAGE, ERROR_MESSAGE, PENDING_MESSAGE, PLAY_DELAY_MINUTES, SIMPLE_ERROR_REASON,
};
use billboard_core::models::{
    AnalysisResult, BookingDetails, DecisionStatus, ModerationDecision, QuickCheck, UserDetails,
    VideoRecord, VideoStatus,
};
use billboard_core::{AppError, AppResult, ModerationConfig};
use billboard_storage::{create_file_system, LocalVideoStore};
use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

use crate::analysis::AnalysisEngine;
use crate::notify::{create_notifier, LogNotifier, Notifier};
use crate::sync::BookingStatusSynchronizer;

/// Something that can moderate a video. The session controller drives any
/// implementation, which keeps it testable without classifiers.
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn moderate(
        &self,
        video: &Path,
        user: Option<&UserDetails>,
        booking: Option<&BookingDetails>,
    ) -> AppResult<ModerationDecision>;
}

/// Turn an analysis result into the decision shown to the user.
pub fn render_decision(result: &AnalysisResult, now: DateTime<Local>) -> ModerationDecision {
    if result.is_approved {
        let play_at = now + ChronoDuration::minutes(PLAY_DELAY_MINUTES);
        return ModerationDecision {
            status: DecisionStatus::Approved,
            message: APPROVED_MESSAGE.to_string(),
            analysis_result: Some(result.clone()),
            estimated_play_time: Some(play_at.format("%I:%M %p").to_string()),
        };
    }

    if result.requires_manual_review {
        return ModerationDecision {
            status: DecisionStatus::Pending,
            message: PENDING_MESSAGE.to_string(),
            analysis_result: Some(result.clone()),
            estimated_play_time: None,
        };
    }

    ModerationDecision {
        status: DecisionStatus::Rejected,
        message: format!(
            "Your video was not approved for display: {}",
            result.reasons.join(", ")
        ),
        analysis_result: Some(result.clone()),
        estimated_play_time: None,
    }
}

pub struct ModerationOrchestrator {
    engine: AnalysisEngine,
    store: Option<Arc<LocalVideoStore>>,
    notifier: Arc<dyn Notifier>,
    synchronizer: Option<Arc<BookingStatusSynchronizer>>,
    side_effects: TaskTracker,
}

impl ModerationOrchestrator {
    /// Orchestrator without storage or backend; notifications are logged.
    pub fn new(engine: AnalysisEngine) -> Self {
        ModerationOrchestrator {
            engine,
            store: None,
            notifier: Arc::new(LogNotifier),
            synchronizer: None,
            side_effects: TaskTracker::new(),
        }
    }

    /// Full pipeline from configuration: store, classifiers, backend sync and notifier.
    pub async fn from_config(config: &ModerationConfig) -> anyhow::Result<Self> {
        if config.is_production() && !config.treat_outage_as_pending {
            tracing::warn!("TREAT_OUTAGE_AS_PENDING=false: a classifier outage will approve videos");
        }

        let store = Arc::new(LocalVideoStore::from_config(
            config,
            create_file_system(config),
        ));
        store.init().await;

        let classifiers = ClassifierSet::from_config(config)?;
        let engine = AnalysisEngine::from_config(config, classifiers);

        let backend = BookingApiClient::from_config(config)?
            .map(|client| Arc::new(client) as Arc<dyn BookingBackend>);
        let synchronizer = BookingStatusSynchronizer::new(store.clone(), backend)
            .with_retries(config.booking_sync_retries, Duration::from_millis(500));

        Ok(ModerationOrchestrator::new(engine)
            .with_store(store)
            .with_synchronizer(Arc::new(synchronizer))
            .with_notifier(create_notifier(config)))
    }

    pub fn with_store(mut self, store: Arc<LocalVideoStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_synchronizer(mut self, synchronizer: Arc<BookingStatusSynchronizer>) -> Self {
        self.synchronizer = Some(synchronizer);
        self
    }

    pub fn store(&self) -> Option<&Arc<LocalVideoStore>> {
        self.store.as_ref()
    }

    /// Moderate a video. Never fails: breakdowns become an `error` decision
    /// carrying a generic retry message.
    pub async fn moderate_video(
        &self,
        video: &Path,
        user: Option<&UserDetails>,
        booking: Option<&BookingDetails>,
    ) -> ModerationDecision {
        match self.try_moderate(video, user, booking).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    video = %video.display(),
                    booking_id = booking.map(|b| b.id.as_str()),
                    "Video moderation failed"
                );
                ModerationDecision::error(ERROR_MESSAGE)
            }
        }
    }

    /// Pass/fail projection without user or booking context. Fails closed.
    pub async fn moderate_video_simple(&self, video: &Path) -> QuickCheck {
        let decision = self.moderate_video(video, None, None).await;
        match decision.status {
            DecisionStatus::Approved => QuickCheck {
                approved: true,
                reason: None,
            },
            DecisionStatus::Error => QuickCheck {
                approved: false,
                reason: Some(SIMPLE_ERROR_REASON.to_string()),
            },
            DecisionStatus::Rejected | DecisionStatus::Pending => QuickCheck {
                approved: false,
                reason: Some(decision.message),
            },
        }
    }

    /// Wait for every notification and sync task spawned so far.
    pub async fn wait_for_side_effects(&self) {
        self.side_effects.close();
        self.side_effects.wait().await;
        self.side_effects.reopen();
    }

    async fn try_moderate(
        &self,
        video: &Path,
        user: Option<&UserDetails>,
        booking: Option<&BookingDetails>,
    ) -> AppResult<ModerationDecision> {
        if !tokio::fs::try_exists(video).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!("video {}", video.display())));
        }

        let record = match booking {
            Some(booking) => self.booking_record(&booking.id).await,
            None => None,
        };

        if let Some(ref record) = record {
            if let Some(decision) = Self::stored_decision(record) {
                tracing::info!(
                    booking_id = %record.booking_id,
                    video_id = %record.id,
                    status = %record.status,
                    "Booking already moderated, returning stored decision"
                );
                return Ok(decision);
            }
        }

        let context = user.zip(booking);
        if let (Some(_), Some(record)) = (context, record.as_ref()) {
            self.mark_analyzing(record).await;
        }

        tracing::info!(
            video = %video.display(),
            booking_id = booking.map(|b| b.id.as_str()),
            "Starting video moderation"
        );

        let result = self.engine.analyze(video).await;
        let decision = render_decision(&result, Local::now());

        tracing::info!(
            video = %video.display(),
            booking_id = booking.map(|b| b.id.as_str()),
            status = %decision.status,
            "Moderation decision rendered"
        );

        if let Some((user, booking)) = context {
            self.dispatch_side_effects(user, booking, &decision, &result);
        }

        Ok(decision)
    }

    async fn booking_record(&self, booking_id: &str) -> Option<VideoRecord> {
        match self.store {
            Some(ref store) => store.get_video_by_booking(booking_id).await,
            None => None,
        }
    }

    fn stored_decision(record: &VideoRecord) -> Option<ModerationDecision> {
        if !record.status.is_terminal() {
            return None;
        }
        let stored = record.moderation_result.as_ref()?;
        Some(render_decision(&AnalysisResult::from(stored), Local::now()))
    }

    async fn mark_analyzing(&self, record: &VideoRecord) {
        let Some(ref store) = self.store else {
            return;
        };
        if record.status != VideoStatus::Uploaded {
            return;
        }
        if let Err(e) = store
            .update_video_status(record.id, VideoStatus::Analyzing, None)
            .await
        {
            tracing::warn!(error = %e, video_id = %record.id, "Failed to mark video as analyzing");
        }
    }

    fn dispatch_side_effects(
        &self,
        user: &UserDetails,
        booking: &BookingDetails,
        decision: &ModerationDecision,
        result: &AnalysisResult,
    ) {
        {
            let notifier = self.notifier.clone();
            let (user, booking, decision) = (user.clone(), booking.clone(), decision.clone());
            self.side_effects.spawn(async move {
                if let Err(e) = notifier.send_push(&user, &booking, &decision).await {
                    tracing::warn!(error = %e, booking_id = %booking.id, "Push notification failed");
                }
            });
        }

        {
            let notifier = self.notifier.clone();
            let (user, booking, decision) = (user.clone(), booking.clone(), decision.clone());
            self.side_effects.spawn(async move {
                if let Err(e) = notifier.send_email(&user, &booking, &decision).await {
                    tracing::warn!(error = %e, booking_id = %booking.id, "Email notification failed");
                }
            });
        }

        if let Some(ref synchronizer) = self.synchronizer {
            let synchronizer = synchronizer.clone();
            let booking_id = booking.id.clone();
            let result = result.clone();
            self.side_effects.spawn(async move {
                synchronizer.synchronize(&booking_id, &result).await;
            });
        }
    }
}

#[async_trait]
impl Moderator for ModerationOrchestrator {
    async fn moderate(
        &self,
        video: &Path,
        user: Option<&UserDetails>,
        booking: Option<&BookingDetails>,
    ) -> AppResult<ModerationDecision> {
        Ok(self.moderate_video(video, user, booking).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use billboard_classifiers::{ImageModel, Label};
    use billboard_core::models::{BookingType, CategoryScores, ModerationResult};
    use billboard_storage::LocalFileSystem;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::frames::SampledFrameExtractor;

    #[derive(Debug, Default)]
    struct CountingImage {
        score: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageModel for CountingImage {
        fn name(&self) -> &str {
            "counting-image"
        }
        async fn classify_image(&self, _image: &[u8], _mime: &str) -> Result<Vec<Label>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Label::new("nsfw", self.score)])
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(&'static str, DecisionStatus)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_push(
            &self,
            _user: &UserDetails,
            _booking: &BookingDetails,
            decision: &ModerationDecision,
        ) -> Result<()> {
            self.sent.lock().unwrap().push(("push", decision.status));
            Ok(())
        }

        async fn send_email(
            &self,
            _user: &UserDetails,
            _booking: &BookingDetails,
            _decision: &ModerationDecision,
        ) -> Result<()> {
            Err(anyhow::anyhow!("smtp down"))
        }
    }

    fn user() -> UserDetails {
        UserDetails {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: None,
            push_token: None,
        }
    }

    fn booking(id: &str) -> BookingDetails {
        BookingDetails {
            id: id.to_string(),
            booking_type: BookingType::Advertisement,
            billboard_name: None,
            location: None,
        }
    }

    fn result(approved: bool, manual: bool) -> AnalysisResult {
        AnalysisResult {
            is_approved: approved,
            confidence: 0.85,
            reasons: vec![
                "Adult content detected (85.0% confidence)".to_string(),
                "Violence detected (75.0% confidence)".to_string(),
            ],
            detected_content: CategoryScores::default(),
            processing_time_ms: 10,
            requires_manual_review: manual,
        }
    }

    fn orchestrator(image: Arc<CountingImage>) -> ModerationOrchestrator {
        let engine = AnalysisEngine::new(
            ClassifierSet::empty().with_image(image),
            Arc::new(SampledFrameExtractor),
        );
        ModerationOrchestrator::new(engine)
    }

    async fn stored(dir: &TempDir, booking_id: &str) -> (Arc<LocalVideoStore>, PathBuf) {
        let store = Arc::new(LocalVideoStore::new(
            Arc::new(LocalFileSystem::new()),
            dir.path().join("data"),
        ));
        store.init().await;
        let src = dir.path().join("ad.mp4");
        tokio::fs::write(&src, vec![7u8; 2048]).await.unwrap();
        let video = store.store_video(&src, "u1", booking_id, None).await.unwrap();
        (store, video.local_path)
    }

    #[test]
    fn approved_decision_has_play_time_five_minutes_out() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 14, 58, 0).unwrap();
        let decision = render_decision(&result(true, false), now);
        assert_eq!(decision.status, DecisionStatus::Approved);
        assert_eq!(decision.message, APPROVED_MESSAGE);
        assert_eq!(decision.estimated_play_time.as_deref(), Some("03:03 PM"));
        assert!(decision.analysis_result.is_some());
    }

    #[test]
    fn rejected_decision_lists_reasons() {
        let decision = render_decision(&result(false, false), Local::now());
        assert_eq!(decision.status, DecisionStatus::Rejected);
        assert!(decision
            .message
            .contains("Adult content detected (85.0% confidence), Violence detected (75.0% confidence)"));
        assert!(decision.estimated_play_time.is_none());
    }

    #[test]
    fn manual_review_is_pending() {
        let decision = render_decision(&result(false, true), Local::now());
        assert_eq!(decision.status, DecisionStatus::Pending);
        assert_eq!(decision.message, PENDING_MESSAGE);
    }

    #[tokio::test]
    async fn missing_video_is_an_error_decision() {
        let orchestrator = orchestrator(Arc::new(CountingImage::default()));
        let decision = orchestrator
            .moderate_video(Path::new("/nonexistent/ad.mp4"), None, None)
            .await;
        assert_eq!(decision, ModerationDecision::error(ERROR_MESSAGE));

        let check = orchestrator
            .moderate_video_simple(Path::new("/nonexistent/ad.mp4"))
            .await;
        assert!(!check.approved);
        assert_eq!(check.reason.as_deref(), Some(SIMPLE_ERROR_REASON));
    }

    #[tokio::test]
    async fn simple_check_projects_decision() {
        let dir = TempDir::new().unwrap();
        let (_, video) = stored(&dir, "b1").await;

        let clean = orchestrator(Arc::new(CountingImage {
            score: 0.1,
            ..Default::default()
        }));
        assert_eq!(
            clean.moderate_video_simple(&video).await,
            QuickCheck {
                approved: true,
                reason: None
            }
        );

        // 1.0 visual * 0.4 weight stays under every threshold
        let still_clean = orchestrator(Arc::new(CountingImage {
            score: 1.0,
            ..Default::default()
        }));
        assert!(still_clean.moderate_video_simple(&video).await.approved);
    }

    #[tokio::test]
    async fn side_effects_need_user_and_booking() {
        let dir = TempDir::new().unwrap();
        let (store, video) = stored(&dir, "b1").await;
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = orchestrator(Arc::new(CountingImage::default()))
            .with_store(store.clone())
            .with_notifier(notifier.clone())
            .with_synchronizer(Arc::new(BookingStatusSynchronizer::new(store.clone(), None)));

        orchestrator.moderate_video(&video, None, Some(&booking("b1"))).await;
        orchestrator.wait_for_side_effects().await;
        assert!(notifier.sent.lock().unwrap().is_empty());
        assert_eq!(
            store.get_video_by_booking("b1").await.unwrap().status,
            VideoStatus::Uploaded
        );

        let decision = orchestrator
            .moderate_video(&video, Some(&user()), Some(&booking("b1")))
            .await;
        orchestrator.wait_for_side_effects().await;

        assert_eq!(decision.status, DecisionStatus::Approved);
        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec![("push", DecisionStatus::Approved)]
        );
        let record = store.get_video_by_booking("b1").await.unwrap();
        assert_eq!(record.status, VideoStatus::Approved);
        assert!(record.moderation_result.unwrap().is_approved);
    }

    #[tokio::test]
    async fn terminal_booking_is_not_analyzed_again() {
        let dir = TempDir::new().unwrap();
        let (store, video) = stored(&dir, "b1").await;
        let record = store.get_video_by_booking("b1").await.unwrap();
        store
            .update_video_status(
                record.id,
                VideoStatus::Rejected,
                Some(ModerationResult::from(&result(false, false))),
            )
            .await
            .unwrap();

        let image = Arc::new(CountingImage::default());
        let orchestrator = orchestrator(image.clone()).with_store(store);

        let decision = orchestrator
            .moderate_video(&video, Some(&user()), Some(&booking("b1")))
            .await;

        assert_eq!(decision.status, DecisionStatus::Rejected);
        assert_eq!(image.calls.load(Ordering::SeqCst), 0);
    }
}
