//! Classifier traits
//!
//! One trait per kind of model the analysis engine consults. Implementations
//! return `Err` for any unusable answer (transport failure, non-2xx, malformed
//! body); the engine treats that as "no signal" for the call.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

use crate::labels::Label;

/// Image classification / NSFW detection
#[async_trait]
pub trait ImageModel: Send + Sync + Debug {
    /// Model identifier, used in logs
    fn name(&self) -> &str;

    async fn classify_image(&self, image: &[u8], mime_type: &str) -> Result<Vec<Label>>;
}

/// Toxicity / sentiment classification
#[async_trait]
pub trait TextModel: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn classify_text(&self, text: &str) -> Result<Vec<Label>>;
}

/// Speech-to-text
#[async_trait]
pub trait TranscriptionModel: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Transcript of the media's audio track. An empty string means the model
    /// answered but heard nothing.
    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<String>;
}

/// On-screen text extraction
#[async_trait]
pub trait OcrModel: Send + Sync + Debug {
    fn name(&self) -> &str;

    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String>;
}
