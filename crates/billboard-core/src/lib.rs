//! Billboard Core Library
//!
//! This crate provides the domain models, error types and configuration shared
//! by the video moderation pipeline: stored video records, analysis results,
//! moderation decisions and the booking context they are synchronised with.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::ModerationConfig;
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
