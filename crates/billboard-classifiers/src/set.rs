//! The set of classifiers one analysis consults

use anyhow::Result;
use billboard_core::ModerationConfig;
use std::sync::Arc;

use crate::classifier::{ImageModel, OcrModel, TextModel, TranscriptionModel};
use crate::client::InferenceClient;
use crate::hosted::{HostedImageModel, HostedOcrModel, HostedTextModel, HostedTranscriptionModel};

/// Models grouped by track. An empty group (or `None`) disables that part of
/// the analysis; it is not counted as a failed call.
#[derive(Debug, Clone, Default)]
pub struct ClassifierSet {
    pub image: Vec<Arc<dyn ImageModel>>,
    pub text: Vec<Arc<dyn TextModel>>,
    pub transcription: Option<Arc<dyn TranscriptionModel>>,
    pub ocr: Option<Arc<dyn OcrModel>>,
}

impl ClassifierSet {
    pub fn empty() -> Self {
        ClassifierSet::default()
    }

    /// Build hosted models for every model id in the configuration
    pub fn from_config(config: &ModerationConfig) -> Result<Self> {
        let client = Arc::new(InferenceClient::new(
            config.inference_api_url.clone(),
            config.inference_api_token.clone(),
            config.classifier_timeout(),
        )?);

        if config.inference_api_token.is_none() {
            tracing::warn!("INFERENCE_API_TOKEN not set, classifier calls are unauthenticated");
        }

        let set = ClassifierSet {
            image: config
                .image_models
                .iter()
                .map(|m| Arc::new(HostedImageModel::new(client.clone(), m.clone())) as Arc<dyn ImageModel>)
                .collect(),
            text: config
                .text_models
                .iter()
                .map(|m| Arc::new(HostedTextModel::new(client.clone(), m.clone())) as Arc<dyn TextModel>)
                .collect(),
            transcription: config.transcription_model.as_ref().map(|m| {
                Arc::new(HostedTranscriptionModel::new(client.clone(), m.clone()))
                    as Arc<dyn TranscriptionModel>
            }),
            ocr: config.ocr_model.as_ref().map(|m| {
                Arc::new(HostedOcrModel::new(client.clone(), m.clone())) as Arc<dyn OcrModel>
            }),
        };

        tracing::info!(
            base_url = %client.base_url(),
            image_models = set.image.len(),
            text_models = set.text.len(),
            transcription = set.transcription.is_some(),
            ocr = set.ocr.is_some(),
            "Classifier set configured"
        );

        Ok(set)
    }

    pub fn with_image(mut self, model: Arc<dyn ImageModel>) -> Self {
        self.image.push(model);
        self
    }

    pub fn with_text(mut self, model: Arc<dyn TextModel>) -> Self {
        self.text.push(model);
        self
    }

    pub fn with_transcription(mut self, model: Arc<dyn TranscriptionModel>) -> Self {
        self.transcription = Some(model);
        self
    }

    pub fn with_ocr(mut self, model: Arc<dyn OcrModel>) -> Self {
        self.ocr = Some(model);
        self
    }

    /// True when no track has a model to call
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
            && self.text.is_empty()
            && self.transcription.is_none()
            && self.ocr.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_hosted_models() {
        let set = ClassifierSet::from_config(&ModerationConfig::default()).unwrap();
        assert_eq!(set.image.len(), 1);
        assert_eq!(set.image[0].name(), "Falconsai/nsfw_image_detection");
        assert_eq!(set.text.len(), 2);
        assert_eq!(set.transcription.as_ref().unwrap().name(), "openai/whisper-base");
        assert!(set.ocr.is_none());
    }

    #[test]
    fn empty_model_lists_disable_tracks() {
        let config = ModerationConfig {
            image_models: vec![],
            text_models: vec![],
            transcription_model: None,
            ..Default::default()
        };
        assert!(ClassifierSet::from_config(&config).unwrap().is_empty());
    }
}
