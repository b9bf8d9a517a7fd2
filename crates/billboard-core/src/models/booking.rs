//! Booking context owned by the external backend.
//!
//! The pipeline only reads the caller-supplied user/booking details and
//! mutates the backend booking through a `BookingUpdate`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::moderation::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
}

/// What the booked billboard slot displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    #[serde(alias = "ad")]
    Advertisement,
    Wish,
}

impl Display for BookingType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BookingType::Advertisement => write!(f, "advertisement"),
            BookingType::Wish => write!(f, "wish"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub id: String,
    pub booking_type: BookingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billboard_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Booking status as displayed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    UnderReview,
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentModerationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModerationUpdate {
    pub moderation_status: ContentModerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_notes: Option<String>,
}

/// Body of the backend booking-update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub status: BookingStatus,
    pub content: ContentModerationUpdate,
}

impl BookingUpdate {
    pub fn from_analysis(result: &AnalysisResult) -> Self {
        let notes = if result.reasons.is_empty() {
            None
        } else {
            Some(result.reasons.join("; "))
        };

        let (status, moderation_status) = if result.is_approved {
            (BookingStatus::Confirmed, ContentModerationStatus::Approved)
        } else if result.requires_manual_review {
            (BookingStatus::UnderReview, ContentModerationStatus::Pending)
        } else {
            (BookingStatus::Rejected, ContentModerationStatus::Rejected)
        };

        BookingUpdate {
            status,
            content: ContentModerationUpdate {
                moderation_status,
                moderation_notes: notes,
            },
        }
    }
}
