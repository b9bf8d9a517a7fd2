//! Booking-status synchronizer
//!
//! Applies an analysis result to the local video record and to the backend
//! booking. The two updates are independent; when only one of them lands the
//! divergence is logged, nothing reconciles it automatically.

use billboard_api_client::BookingBackend;
use billboard_core::models::{AnalysisResult, BookingUpdate, ModerationResult, VideoStatus};
use billboard_storage::LocalVideoStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// What each side of a synchronization did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub local_updated: bool,
    /// `None` when no backend is configured
    pub backend_updated: Option<bool>,
}

impl SyncOutcome {
    pub fn diverged(&self) -> bool {
        matches!(self.backend_updated, Some(backend) if backend != self.local_updated)
    }
}

pub struct BookingStatusSynchronizer {
    store: Arc<LocalVideoStore>,
    backend: Option<Arc<dyn BookingBackend>>,
    retries: u32,
    retry_delay: Duration,
}

impl BookingStatusSynchronizer {
    pub fn new(store: Arc<LocalVideoStore>, backend: Option<Arc<dyn BookingBackend>>) -> Self {
        BookingStatusSynchronizer {
            store,
            backend,
            retries: 1,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Extra backend attempts after the first failure, and the base delay between them
    pub fn with_retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Record status a result maps to. Results waiting for manual review keep
    /// the video in `analyzing`.
    pub fn video_status_for(result: &AnalysisResult) -> VideoStatus {
        if result.is_approved {
            VideoStatus::Approved
        } else if result.requires_manual_review {
            VideoStatus::Analyzing
        } else {
            VideoStatus::Rejected
        }
    }

    pub async fn synchronize(&self, booking_id: &str, result: &AnalysisResult) -> SyncOutcome {
        let local_updated = self.update_local(booking_id, result).await;
        let backend_updated = match self.backend {
            Some(ref backend) => Some(self.update_backend(backend.as_ref(), booking_id, result).await),
            None => None,
        };

        let outcome = SyncOutcome {
            local_updated,
            backend_updated,
        };

        if outcome.diverged() {
            tracing::warn!(
                booking_id = %booking_id,
                local_updated = local_updated,
                backend_updated = ?backend_updated,
                "Local and backend moderation status diverged"
            );
        }

        outcome
    }

    async fn update_local(&self, booking_id: &str, result: &AnalysisResult) -> bool {
        let Some(record) = self.store.get_video_by_booking(booking_id).await else {
            tracing::warn!(booking_id = %booking_id, "No stored video for booking, local status not updated");
            return false;
        };

        if record.status.is_terminal() {
            tracing::warn!(
                booking_id = %booking_id,
                video_id = %record.id,
                status = %record.status,
                "Video already has a final decision, local status left unchanged"
            );
            return false;
        }

        let status = Self::video_status_for(result);
        match self
            .store
            .update_video_status(record.id, status, Some(ModerationResult::from(result)))
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    booking_id = %booking_id,
                    video_id = %record.id,
                    "Failed to update local video status"
                );
                false
            }
        }
    }

    async fn update_backend(
        &self,
        backend: &dyn BookingBackend,
        booking_id: &str,
        result: &AnalysisResult,
    ) -> bool {
        let update = BookingUpdate::from_analysis(result);
        let attempts = self.retries + 1;

        for attempt in 1..=attempts {
            match backend.update_booking(booking_id, &update).await {
                Ok(()) => return true,
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        error = %e,
                        booking_id = %booking_id,
                        attempt = attempt,
                        "Booking update failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        booking_id = %booking_id,
                        attempts = attempts,
                        "Booking update failed"
                    );
                }
            }
        }

        false
    }
}
