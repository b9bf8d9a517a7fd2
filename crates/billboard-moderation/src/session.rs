//! Moderation session controller
//!
//! Per-session observable state around one moderation run. Progress is
//! synthetic: a ticker raises it in fixed steps up to a cap while the
//! moderator works, then the final state jumps to 100.

use billboard_core::constants::{SYNTHETIC_PROGRESS_CAP, SYNTHETIC_PROGRESS_STEP};
use billboard_core::models::{BookingDetails, ModerationDecision, UserDetails};
use billboard_core::{AppError, AppResult, ErrorMetadata, LogLevel};
use billboard_storage::LocalVideoStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};
use tokio_util::task::AbortOnDropHandle;

use crate::orchestrator::Moderator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Uploading,
    Analyzing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationSessionState {
    pub is_analyzing: bool,
    /// 0-100, never decreases within one run
    pub progress: u8,
    pub status: SessionStatus,
    pub result: Option<ModerationDecision>,
    pub error: Option<String>,
}

pub struct ModerationSession {
    moderator: Arc<dyn Moderator>,
    tick: Duration,
    state: Arc<watch::Sender<ModerationSessionState>>,
}

impl ModerationSession {
    pub fn new(moderator: Arc<dyn Moderator>) -> Self {
        let (state, _) = watch::channel(ModerationSessionState::default());
        ModerationSession {
            moderator,
            tick: Duration::from_millis(500),
            state: Arc::new(state),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ModerationSessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModerationSessionState> {
        self.state.subscribe()
    }

    /// Back to idle. Does not cancel a run in flight.
    pub fn reset_state(&self) {
        self.state.send_replace(ModerationSessionState::default());
    }

    /// Run the moderator while publishing progress. Errors are recorded in the
    /// state and also returned.
    pub async fn analyze_video(
        &self,
        video: PathBuf,
        user: Option<UserDetails>,
        booking: Option<BookingDetails>,
    ) -> AppResult<ModerationDecision> {
        self.state.send_modify(|s| {
            s.is_analyzing = true;
            s.status = SessionStatus::Analyzing;
            s.progress = 0;
            s.error = None;
        });

        // Aborted on drop, so a caller that abandons this future does not
        // leave the ticker writing progress. The moderator itself runs on.
        let ticker = self.spawn_ticker();

        let moderator = self.moderator.clone();
        let joined = tokio::spawn(async move {
            moderator
                .moderate(&video, user.as_ref(), booking.as_ref())
                .await
        })
        .await;

        ticker.abort();
        let _ = ticker.await;

        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(AppError::Internal(format!("Moderation task failed: {}", e))),
        };

        match outcome {
            Ok(decision) => {
                tracing::debug!(status = %decision.status, "Moderation session completed");
                self.state.send_modify(|s| {
                    s.is_analyzing = false;
                    s.status = SessionStatus::Completed;
                    s.progress = 100;
                    s.result = Some(decision.clone());
                });
                Ok(decision)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Store the video first, then analyze the stored copy.
    pub async fn upload_and_analyze(
        &self,
        store: &LocalVideoStore,
        source: &Path,
        user: UserDetails,
        booking: BookingDetails,
        original_name: Option<&str>,
    ) -> AppResult<ModerationDecision> {
        self.state.send_modify(|s| {
            s.is_analyzing = false;
            s.status = SessionStatus::Uploading;
            s.progress = 0;
            s.error = None;
        });

        let stored = match store
            .store_video(source, &user.id, &booking.id, original_name)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                let e = AppError::from(e);
                self.fail(&e);
                return Err(e);
            }
        };

        self.analyze_video(stored.local_path, Some(user), Some(booking))
            .await
    }

    /// Record a failure. The state carries the client-safe message only.
    fn fail(&self, e: &AppError) {
        let code = e.error_code();
        match e.log_level() {
            LogLevel::Error => {
                tracing::error!(error = %e.detailed_message(), code = code, "Moderation session failed")
            }
            LogLevel::Warn => tracing::warn!(error = %e, code = code, "Moderation session failed"),
            LogLevel::Debug => tracing::debug!(error = %e, code = code, "Moderation session failed"),
        }
        let message = e.client_message();
        self.state.send_modify(|s| {
            s.is_analyzing = false;
            s.status = SessionStatus::Error;
            s.error = Some(message);
        });
    }

    fn spawn_ticker(&self) -> AbortOnDropHandle<()> {
        let state = self.state.clone();
        let tick = self.tick;
        AbortOnDropHandle::new(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + tick, tick);
            loop {
                interval.tick().await;
                state.send_modify(|s| {
                    s.progress = s
                        .progress
                        .saturating_add(SYNTHETIC_PROGRESS_STEP)
                        .min(SYNTHETIC_PROGRESS_CAP)
                        .max(s.progress);
                });
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use billboard_core::models::DecisionStatus;
    use billboard_storage::LocalFileSystem;
    use tempfile::TempDir;

    struct DelayedModerator {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl Moderator for DelayedModerator {
        async fn moderate(
            &self,
            _video: &Path,
            _user: Option<&UserDetails>,
            _booking: Option<&BookingDetails>,
        ) -> AppResult<ModerationDecision> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(AppError::Classifier("inference endpoint unreachable".to_string()));
            }
            Ok(ModerationDecision {
                status: DecisionStatus::Approved,
                message: "ok".to_string(),
                analysis_result: None,
                estimated_play_time: None,
            })
        }
    }

    struct PanickingModerator;

    #[async_trait]
    impl Moderator for PanickingModerator {
        async fn moderate(
            &self,
            _video: &Path,
            _user: Option<&UserDetails>,
            _booking: Option<&BookingDetails>,
        ) -> AppResult<ModerationDecision> {
            panic!("moderator crashed");
        }
    }

    fn session(delay_ms: u64, fail: bool) -> ModerationSession {
        ModerationSession::new(Arc::new(DelayedModerator {
            delay: Duration::from_millis(delay_ms),
            fail,
        }))
        .with_tick(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_capped() {
        let session = session(200, false);
        let mut rx = session.subscribe();

        let observer = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                seen.push(state.progress);
                if state.status == SessionStatus::Completed {
                    break;
                }
            }
            seen
        });

        let decision = session
            .analyze_video(PathBuf::from("ad.mp4"), None, None)
            .await
            .unwrap();
        assert_eq!(decision.status, DecisionStatus::Approved);

        let seen = observer.await.unwrap();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen[..seen.len() - 1].iter().all(|p| *p <= SYNTHETIC_PROGRESS_CAP));
        assert!(seen.contains(&SYNTHETIC_PROGRESS_CAP));

        let state = session.state();
        assert!(!state.is_analyzing);
        assert_eq!(state.status, SessionStatus::Completed);
        assert_eq!(state.result, Some(decision));
    }

    #[tokio::test]
    async fn ticker_stops_after_completion() {
        let session = session(5, false);
        session
            .analyze_video(PathBuf::from("ad.mp4"), None, None)
            .await
            .unwrap();

        session.reset_state();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(session.state(), ModerationSessionState::default());
    }

    #[tokio::test]
    async fn errors_are_recorded_and_rethrown() {
        let session = session(5, true);
        let err = session
            .analyze_video(PathBuf::from("ad.mp4"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Classifier(_)));

        let state = session.state();
        assert!(!state.is_analyzing);
        assert_eq!(state.status, SessionStatus::Error);
        assert_eq!(
            state.error.as_deref(),
            Some("Content analysis is temporarily unavailable")
        );
    }

    #[tokio::test]
    async fn panicking_moderator_becomes_internal_error() {
        let session = ModerationSession::new(Arc::new(PanickingModerator));
        let err = session
            .analyze_video(PathBuf::from("ad.mp4"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(session.state().status, SessionStatus::Error);
    }

    #[tokio::test]
    async fn abandoned_run_stops_the_ticker() {
        let session = session(5_000, false);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(30),
            session.analyze_video(PathBuf::from("ad.mp4"), None, None),
        )
        .await;
        assert!(abandoned.is_err());

        session.reset_state();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(session.state(), ModerationSessionState::default());
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let session = session(5, true);
        let _ = session.analyze_video(PathBuf::from("ad.mp4"), None, None).await;
        session.reset_state();
        assert_eq!(session.state(), ModerationSessionState::default());
    }

    #[tokio::test]
    async fn failed_upload_never_analyzes() {
        let dir = TempDir::new().unwrap();
        let store = LocalVideoStore::new(Arc::new(LocalFileSystem::new()), dir.path().join("data"));
        store.init().await;
        let source = dir.path().join("ad.gif");
        tokio::fs::write(&source, b"GIF89a").await.unwrap();

        let session = session(5, false);
        let user = UserDetails {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: None,
            push_token: None,
        };
        let booking = BookingDetails {
            id: "b1".to_string(),
            booking_type: billboard_core::models::BookingType::Wish,
            billboard_name: None,
            location: None,
        };

        let err = session
            .upload_and_analyze(&store, &source, user, booking, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
        let state = session.state();
        assert_eq!(state.status, SessionStatus::Error);
        assert_eq!(state.error.as_deref(), Some("Unsupported video format: gif"));
        assert!(store.get_all_videos().await.is_empty());
    }
}
