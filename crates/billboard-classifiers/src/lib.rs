//! Remote classifier access for the moderation pipeline
//!
//! The analysis engine only talks to the traits in [`classifier`]. The hosted
//! implementations call a bearer-authenticated inference API that accepts
//! `{"inputs": ...}` and answers with label/score lists, transcripts or
//! generated text depending on the model.

pub mod classifier;
pub mod client;
pub mod hosted;
pub mod labels;
pub mod set;

pub use classifier::{ImageModel, OcrModel, TextModel, TranscriptionModel};
pub use client::InferenceClient;
pub use hosted::{HostedImageModel, HostedOcrModel, HostedTextModel, HostedTranscriptionModel};
pub use labels::{data_uri, Label};
pub use set::ClassifierSet;
