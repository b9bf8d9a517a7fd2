//! Analysis engine
//!
//! Runs the visual, audio and on-screen text tracks concurrently, combines
//! their category scores with fixed weights, and checks the result against
//! the rejection thresholds.
//!
//! Every classifier call is individually bounded and fallible: a failed call
//! contributes nothing. Anything that breaks the analysis as a whole (frames
//! cannot be produced, a track panics, the overall timeout elapses) fails
//! closed to a rejected result.

use anyhow::{anyhow, Context, Result};
use billboard_classifiers::{ClassifierSet, Label};
use billboard_core::constants::{
    APPROVAL_REASON, AUDIO_WEIGHT, TEXT_HARASSMENT_FACTOR, TEXT_WEIGHT, VISUAL_WEIGHT,
};
use billboard_core::models::{AnalysisResult, Category, CategoryScores, Thresholds};
use billboard_core::ModerationConfig;
use futures::future::join_all;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::AbortOnDropHandle;

use crate::frames::{FfmpegFrameExtractor, Frame, FrameExtractor, SampledFrameExtractor};

/// Scores of one track plus how many classifier calls it made and how many
/// produced a usable answer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackOutcome {
    pub scores: CategoryScores,
    pub attempted: usize,
    pub succeeded: usize,
}

impl TrackOutcome {
    fn absorb(&mut self, other: TrackOutcome) {
        self.scores.merge_max(&other.scores);
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
    }
}

/// Map image-classifier labels onto categories (substring match, per-category max)
pub fn map_image_labels(labels: &[Label]) -> CategoryScores {
    let mut scores = CategoryScores::default();

    for Label { label, score } in labels {
        let label = label.to_lowercase();

        if label.contains("nsfw") || label.contains("porn") || label.contains("adult") {
            scores.raise(Category::Adult, *score);
        }
        if label.contains("violence") || label.contains("weapon") || label.contains("blood") {
            scores.raise(Category::Violence, *score);
        }
        if label.contains("hate") || label.contains("discrimin") {
            scores.raise(Category::Hate, *score);
        }
        if label.contains("harassment") || label.contains("bully") {
            scores.raise(Category::Harassment, *score);
        }
        if label.contains("self") && label.contains("harm") {
            scores.raise(Category::SelfHarm, *score);
        }
    }

    scores
}

/// Map text-classifier labels: `TOXIC`/`NEGATIVE` feed hate directly and
/// harassment at a reduced factor.
pub fn map_text_labels(labels: &[Label]) -> CategoryScores {
    let mut scores = CategoryScores::default();

    for Label { label, score } in labels {
        if label.eq_ignore_ascii_case("toxic") || label.eq_ignore_ascii_case("negative") {
            scores.raise(Category::Hate, *score);
            scores.raise(Category::Harassment, *score * TEXT_HARASSMENT_FACTOR);
        }
    }

    scores
}

/// Weighted per-category average of the three tracks
pub fn combine(visual: &CategoryScores, audio: &CategoryScores, text: &CategoryScores) -> CategoryScores {
    let mut combined = CategoryScores::default();
    for category in Category::ALL {
        combined.set(
            category,
            visual.get(category) * VISUAL_WEIGHT
                + audio.get(category) * AUDIO_WEIGHT
                + text.get(category) * TEXT_WEIGHT,
        );
    }
    combined
}

/// Decide approve/reject for combined scores
pub fn evaluate(
    scores: &CategoryScores,
    thresholds: &Thresholds,
    processing_time_ms: u64,
) -> AnalysisResult {
    let violations: Vec<(Category, f64)> = scores
        .iter()
        .filter(|(category, score)| thresholds.violates(*category, *score))
        .collect();

    if violations.is_empty() {
        return AnalysisResult {
            is_approved: true,
            confidence: 1.0 - scores.max(),
            reasons: vec![APPROVAL_REASON.to_string()],
            detected_content: *scores,
            processing_time_ms,
            requires_manual_review: false,
        };
    }

    let confidence = violations.iter().map(|(_, s)| *s).fold(0.0, f64::max);
    let reasons = violations
        .iter()
        .map(|(category, score)| {
            format!(
                "{} detected ({:.1}% confidence)",
                category.display_name(),
                score * 100.0
            )
        })
        .collect();

    AnalysisResult {
        is_approved: false,
        confidence,
        reasons,
        detected_content: *scores,
        processing_time_ms,
        requires_manual_review: false,
    }
}

#[derive(Clone, Debug)]
pub struct AnalysisEngine {
    classifiers: Arc<ClassifierSet>,
    frames: Arc<dyn FrameExtractor>,
    thresholds: Thresholds,
    frame_count: usize,
    call_timeout: Duration,
    analysis_timeout: Duration,
    treat_outage_as_pending: bool,
}

impl AnalysisEngine {
    pub fn new(classifiers: ClassifierSet, frames: Arc<dyn FrameExtractor>) -> Self {
        let defaults = ModerationConfig::default();
        AnalysisEngine {
            classifiers: Arc::new(classifiers),
            frames,
            thresholds: Thresholds::DEFAULT,
            frame_count: defaults.frame_count,
            call_timeout: defaults.classifier_timeout(),
            analysis_timeout: defaults.analysis_timeout(),
            treat_outage_as_pending: defaults.treat_outage_as_pending,
        }
    }

    pub fn from_config(config: &ModerationConfig, classifiers: ClassifierSet) -> Self {
        let frames: Arc<dyn FrameExtractor> = match config.ffmpeg_path {
            Some(ref path) => Arc::new(FfmpegFrameExtractor::new(path)),
            None => Arc::new(SampledFrameExtractor),
        };

        AnalysisEngine::new(classifiers, frames)
            .with_frame_count(config.frame_count)
            .with_timeouts(config.classifier_timeout(), config.analysis_timeout())
            .with_outage_as_pending(config.treat_outage_as_pending)
    }

    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn with_timeouts(mut self, call_timeout: Duration, analysis_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self.analysis_timeout = analysis_timeout;
        self
    }

    pub fn with_outage_as_pending(mut self, enabled: bool) -> Self {
        self.treat_outage_as_pending = enabled;
        self
    }

    /// Analyze one video. Never fails: breakdowns yield the rejected safe default.
    pub async fn analyze(&self, video: &Path) -> AnalysisResult {
        let start = Instant::now();

        let outcome = tokio::time::timeout(self.analysis_timeout, self.run(video, start)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(result)) => {
                tracing::info!(
                    video = %video.display(),
                    approved = result.is_approved,
                    manual_review = result.requires_manual_review,
                    confidence = result.confidence,
                    processing_time_ms = result.processing_time_ms,
                    "Video analysis complete"
                );
                result
            }
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    video = %video.display(),
                    "Video analysis failed, rejecting for manual review"
                );
                AnalysisResult::safe_default(elapsed_ms)
            }
            Err(_) => {
                tracing::error!(
                    video = %video.display(),
                    timeout_secs = self.analysis_timeout.as_secs(),
                    "Video analysis timed out, rejecting for manual review"
                );
                AnalysisResult::safe_default(elapsed_ms)
            }
        }
    }

    async fn run(&self, video: &Path, start: Instant) -> Result<AnalysisResult> {
        if self.classifiers.is_empty() && self.treat_outage_as_pending {
            tracing::warn!("No classifiers configured, video needs manual review");
            return Ok(AnalysisResult::outage(start.elapsed().as_millis() as u64));
        }

        let frames = self
            .frames
            .extract_frames(video, self.frame_count)
            .await
            .context("Failed to extract frames")?;
        let frames = Arc::new(frames);

        // Dropping `run` on the overall timeout aborts whatever tracks are
        // still in flight.
        let visual = AbortOnDropHandle::new(tokio::spawn({
            let engine = self.clone();
            let frames = frames.clone();
            async move { engine.visual_track(&frames).await }
        }));
        let audio = AbortOnDropHandle::new(tokio::spawn({
            let engine = self.clone();
            let video: PathBuf = video.to_path_buf();
            async move { engine.audio_track(&video).await }
        }));
        let text = AbortOnDropHandle::new(tokio::spawn({
            let engine = self.clone();
            let frames = frames.clone();
            async move { engine.text_track(&frames).await }
        }));

        let (visual, audio, text) = tokio::join!(visual, audio, text);
        let visual = visual.map_err(|e| anyhow!("Visual track aborted: {}", e))?;
        let audio = audio.map_err(|e| anyhow!("Audio track aborted: {}", e))?;
        let text = text.map_err(|e| anyhow!("Text track aborted: {}", e))?;

        tracing::debug!(
            visual = ?visual.scores,
            audio = ?audio.scores,
            text = ?text.scores,
            "Track scores"
        );

        let elapsed_ms = start.elapsed().as_millis() as u64;

        if self.treat_outage_as_pending {
            let dark: Vec<&str> = [("visual", &visual), ("audio", &audio), ("text", &text)]
                .into_iter()
                .filter(|(_, track)| track.attempted > 0 && track.succeeded == 0)
                .map(|(name, _)| name)
                .collect();
            if !dark.is_empty() {
                tracing::warn!(
                    tracks = ?dark,
                    "Every classifier call of a track failed, video needs manual review"
                );
                return Ok(AnalysisResult::outage(elapsed_ms));
            }
        }

        let combined = combine(&visual.scores, &audio.scores, &text.scores);
        Ok(evaluate(&combined, &self.thresholds, elapsed_ms))
    }

    /// Run one classifier call under the per-call timeout; `None` on any failure.
    async fn call<T, F>(&self, track: &'static str, model: &str, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!(track = track, model = %model, error = %e, "Classifier call failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    track = track,
                    model = %model,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Classifier call timed out"
                );
                None
            }
        }
    }

    async fn visual_track(&self, frames: &[Frame]) -> TrackOutcome {
        let calls = frames.iter().flat_map(|frame| {
            self.classifiers.image.iter().map(move |model| async move {
                self.call(
                    "visual",
                    model.name(),
                    model.classify_image(&frame.data, &frame.mime_type),
                )
                .await
            })
        });

        let mut outcome = TrackOutcome::default();
        for labels in join_all(calls).await {
            outcome.attempted += 1;
            if let Some(labels) = labels {
                outcome.succeeded += 1;
                outcome.scores.merge_max(&map_image_labels(&labels));
            }
        }
        outcome
    }

    async fn audio_track(&self, video: &Path) -> TrackOutcome {
        let Some(model) = self.classifiers.transcription.clone() else {
            return TrackOutcome::default();
        };

        let mut outcome = TrackOutcome {
            attempted: 1,
            ..Default::default()
        };

        let clip = match self.frames.extract_audio(video).await {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!(error = %e, "Audio extraction failed");
                return outcome;
            }
        };

        let Some(transcript) = self
            .call("audio", model.name(), model.transcribe(&clip.data, &clip.mime_type))
            .await
        else {
            return outcome;
        };
        outcome.succeeded = 1;

        outcome.absorb(self.harmful_text("audio", &transcript).await);
        outcome
    }

    async fn text_track(&self, frames: &[Frame]) -> TrackOutcome {
        let Some(model) = self.classifiers.ocr.clone() else {
            return TrackOutcome::default();
        };

        let calls = frames.iter().map(|frame| {
            let model = model.clone();
            async move {
                self.call(
                    "text",
                    model.name(),
                    model.extract_text(&frame.data, &frame.mime_type),
                )
                .await
            }
        });

        let mut outcome = TrackOutcome::default();
        let mut texts = Vec::new();
        for text in join_all(calls).await {
            outcome.attempted += 1;
            if let Some(text) = text {
                outcome.succeeded += 1;
                if !text.trim().is_empty() {
                    texts.push(text);
                }
            }
        }

        outcome.absorb(self.harmful_text("text", &texts.join(" ")).await);
        outcome
    }

    /// Shared toxicity analysis for transcripts and on-screen text
    async fn harmful_text(&self, track: &'static str, text: &str) -> TrackOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TrackOutcome::default();
        }

        let calls = self.classifiers.text.iter().map(|model| async move {
            self.call(track, model.name(), model.classify_text(text)).await
        });

        let mut outcome = TrackOutcome::default();
        for labels in join_all(calls).await {
            outcome.attempted += 1;
            if let Some(labels) = labels {
                outcome.succeeded += 1;
                outcome.scores.merge_max(&map_text_labels(&labels));
            }
        }
        outcome
    }
}
