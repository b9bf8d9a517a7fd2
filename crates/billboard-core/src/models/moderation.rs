use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::{ANALYSIS_FAILED_REASON, OUTAGE_REASON};

/// Policy categories every classifier signal is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Violence,
    Adult,
    Hate,
    Harassment,
    SelfHarm,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Violence,
        Category::Adult,
        Category::Hate,
        Category::Harassment,
        Category::SelfHarm,
    ];

    /// Key used in serialized score maps.
    pub fn key(self) -> &'static str {
        match self {
            Category::Violence => "violence",
            Category::Adult => "adult",
            Category::Hate => "hate",
            Category::Harassment => "harassment",
            Category::SelfHarm => "selfHarm",
        }
    }

    /// Human-readable name used in rejection reasons.
    pub fn display_name(self) -> &'static str {
        match self {
            Category::Violence => "Violence",
            Category::Adult => "Adult content",
            Category::Hate => "Hate speech",
            Category::Harassment => "Harassment",
            Category::SelfHarm => "Self-harm",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.key())
    }
}

/// Per-category risk scores, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub violence: f64,
    pub adult: f64,
    pub hate: f64,
    pub harassment: f64,
    pub self_harm: f64,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Violence => self.violence,
            Category::Adult => self.adult,
            Category::Hate => self.hate,
            Category::Harassment => self.harassment,
            Category::SelfHarm => self.self_harm,
        }
    }

    fn slot(&mut self, category: Category) -> &mut f64 {
        match category {
            Category::Violence => &mut self.violence,
            Category::Adult => &mut self.adult,
            Category::Hate => &mut self.hate,
            Category::Harassment => &mut self.harassment,
            Category::SelfHarm => &mut self.self_harm,
        }
    }

    pub fn set(&mut self, category: Category, score: f64) {
        *self.slot(category) = score.clamp(0.0, 1.0);
    }

    /// Raise a category to `score` if it is higher than the current value.
    pub fn raise(&mut self, category: Category, score: f64) {
        let slot = self.slot(category);
        let score = score.clamp(0.0, 1.0);
        if score > *slot {
            *slot = score;
        }
    }

    /// Per-category maximum of two score maps.
    pub fn merge_max(&mut self, other: &CategoryScores) {
        for category in Category::ALL {
            self.raise(category, other.get(category));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Highest score over all categories.
    pub fn max(&self) -> f64 {
        self.iter().map(|(_, s)| s).fold(0.0, f64::max)
    }
}

/// Fixed rejection thresholds. A category violates when its combined score
/// is strictly greater than its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub violence: f64,
    pub adult: f64,
    pub hate: f64,
    pub harassment: f64,
    pub self_harm: f64,
}

impl Thresholds {
    pub const DEFAULT: Thresholds = Thresholds {
        violence: 0.7,
        adult: 0.8,
        hate: 0.6,
        harassment: 0.7,
        self_harm: 0.8,
    };

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Violence => self.violence,
            Category::Adult => self.adult,
            Category::Hate => self.hate,
            Category::Harassment => self.harassment,
            Category::SelfHarm => self.self_harm,
        }
    }

    pub fn violates(&self, category: Category, score: f64) -> bool {
        score > self.get(category)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds::DEFAULT
    }
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_approved: bool,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub detected_content: CategoryScores,
    #[serde(rename = "processingTime")]
    pub processing_time_ms: u64,
    /// No classifier produced a signal; a person has to look at the video.
    #[serde(default)]
    pub requires_manual_review: bool,
}

impl AnalysisResult {
    /// Fail-closed result used when the analysis itself breaks down.
    pub fn safe_default(processing_time_ms: u64) -> Self {
        AnalysisResult {
            is_approved: false,
            confidence: 0.0,
            reasons: vec![ANALYSIS_FAILED_REASON.to_string()],
            detected_content: CategoryScores::default(),
            processing_time_ms,
            requires_manual_review: false,
        }
    }

    /// Result used when every classifier call failed.
    pub fn outage(processing_time_ms: u64) -> Self {
        AnalysisResult {
            is_approved: false,
            confidence: 0.0,
            reasons: vec![OUTAGE_REASON.to_string()],
            detected_content: CategoryScores::default(),
            processing_time_ms,
            requires_manual_review: true,
        }
    }
}

/// Moderation outcome attached to a stored video once a decision is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub is_approved: bool,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub detected_content: CategoryScores,
    #[serde(default)]
    pub requires_manual_review: bool,
    pub moderated_at: DateTime<Utc>,
}

impl From<&AnalysisResult> for ModerationResult {
    fn from(result: &AnalysisResult) -> Self {
        ModerationResult {
            is_approved: result.is_approved,
            confidence: result.confidence,
            reasons: result.reasons.clone(),
            detected_content: result.detected_content,
            requires_manual_review: result.requires_manual_review,
            moderated_at: Utc::now(),
        }
    }
}

impl From<&ModerationResult> for AnalysisResult {
    fn from(result: &ModerationResult) -> Self {
        AnalysisResult {
            is_approved: result.is_approved,
            confidence: result.confidence,
            reasons: result.reasons.clone(),
            detected_content: result.detected_content,
            processing_time_ms: 0,
            requires_manual_review: result.requires_manual_review,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Approved,
    Rejected,
    Pending,
    Error,
}

impl Display for DecisionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DecisionStatus::Approved => write!(f, "approved"),
            DecisionStatus::Rejected => write!(f, "rejected"),
            DecisionStatus::Pending => write!(f, "pending"),
            DecisionStatus::Error => write!(f, "error"),
        }
    }
}

/// Decision returned to callers of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationDecision {
    pub status: DecisionStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<AnalysisResult>,
    /// Only set for approved videos, e.g. "3:05 PM".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_play_time: Option<String>,
}

impl ModerationDecision {
    pub fn error(message: impl Into<String>) -> Self {
        ModerationDecision {
            status: DecisionStatus::Error,
            message: message.into(),
            analysis_result: None,
            estimated_play_time: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == DecisionStatus::Approved
    }
}

/// Projection of a decision for call sites that only need pass/fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickCheck {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
