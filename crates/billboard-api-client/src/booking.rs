//! Booking-update endpoint.

use anyhow::Result;
use async_trait::async_trait;
use billboard_core::models::BookingUpdate;
use billboard_core::ModerationConfig;

use crate::{ApiClient, Auth};

/// The backend's booking-update capability
#[async_trait]
pub trait BookingBackend: Send + Sync {
    /// Set a booking's status and content-moderation fields
    async fn update_booking(&self, booking_id: &str, update: &BookingUpdate) -> Result<()>;
}

/// `PATCH {base}/bookings/{id}` against the booking backend
#[derive(Clone, Debug)]
pub struct BookingApiClient {
    api: ApiClient,
}

impl BookingApiClient {
    pub fn new(api: ApiClient) -> Self {
        BookingApiClient { api }
    }

    /// Client for `BOOKING_API_URL`, or `None` when no backend is configured.
    pub fn from_config(config: &ModerationConfig) -> Result<Option<Self>> {
        let Some(base_url) = config.booking_api_url.clone() else {
            return Ok(None);
        };

        let auth = match config.booking_api_token.clone() {
            Some(token) => Auth::Bearer(token),
            None => {
                tracing::warn!("BOOKING_API_TOKEN not set, booking updates are unauthenticated");
                Auth::Anonymous
            }
        };

        Ok(Some(BookingApiClient::new(ApiClient::new(base_url, auth)?)))
    }

    fn booking_path(booking_id: &str) -> String {
        format!("/bookings/{}", urlencoding::encode(booking_id))
    }
}

#[async_trait]
impl BookingBackend for BookingApiClient {
    async fn update_booking(&self, booking_id: &str, update: &BookingUpdate) -> Result<()> {
        let path = Self::booking_path(booking_id);
        self.api.patch_json(&path, update).await?;

        tracing::info!(
            booking_id = %booking_id,
            status = ?update.status,
            moderation_status = ?update.content.moderation_status,
            "Booking moderation status updated"
        );
        Ok(())
    }
}
