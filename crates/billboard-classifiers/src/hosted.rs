//! Classifier implementations backed by the hosted inference API

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::classifier::{ImageModel, OcrModel, TextModel, TranscriptionModel};
use crate::client::InferenceClient;
use crate::labels::{data_uri, parse_generated_text, parse_labels, parse_transcript, Label};

#[derive(Debug, Clone)]
pub struct HostedImageModel {
    client: Arc<InferenceClient>,
    model: String,
}

impl HostedImageModel {
    pub fn new(client: Arc<InferenceClient>, model: impl Into<String>) -> Self {
        HostedImageModel {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageModel for HostedImageModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify_image(&self, image: &[u8], mime_type: &str) -> Result<Vec<Label>> {
        let body = self
            .client
            .infer(&self.model, Value::String(data_uri(image, mime_type)))
            .await?;
        parse_labels(&body)
    }
}

#[derive(Debug, Clone)]
pub struct HostedTextModel {
    client: Arc<InferenceClient>,
    model: String,
}

impl HostedTextModel {
    pub fn new(client: Arc<InferenceClient>, model: impl Into<String>) -> Self {
        HostedTextModel {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextModel for HostedTextModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify_text(&self, text: &str) -> Result<Vec<Label>> {
        let body = self
            .client
            .infer(&self.model, Value::String(text.to_string()))
            .await?;
        parse_labels(&body)
    }
}

#[derive(Debug, Clone)]
pub struct HostedTranscriptionModel {
    client: Arc<InferenceClient>,
    model: String,
}

impl HostedTranscriptionModel {
    pub fn new(client: Arc<InferenceClient>, model: impl Into<String>) -> Self {
        HostedTranscriptionModel {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TranscriptionModel for HostedTranscriptionModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn transcribe(&self, media: &[u8], mime_type: &str) -> Result<String> {
        let body = self
            .client
            .infer(&self.model, Value::String(data_uri(media, mime_type)))
            .await?;
        parse_transcript(&body)
    }
}

#[derive(Debug, Clone)]
pub struct HostedOcrModel {
    client: Arc<InferenceClient>,
    model: String,
}

impl HostedOcrModel {
    pub fn new(client: Arc<InferenceClient>, model: impl Into<String>) -> Self {
        HostedOcrModel {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl OcrModel for HostedOcrModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn extract_text(&self, image: &[u8], mime_type: &str) -> Result<String> {
        let body = self
            .client
            .infer(&self.model, Value::String(data_uri(image, mime_type)))
            .await?;
        parse_generated_text(&body)
    }
}
