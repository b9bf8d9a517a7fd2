//! Error types module
//!
//! `AppError` unifies the failures the moderation pipeline can surface:
//! invalid input, storage, remote classifier, booking backend and internal
//! errors. Each variant self-describes how it should be presented through
//! `ErrorMetadata`, so callers never show raw error text to end users.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like remote outages
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to callers
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("Unsupported video format: {0}")]
    UnsupportedFormat(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage is not available on this platform")]
    StorageUnavailable,

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type using `AppError`
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        AppError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        AppError::PayloadTooLarge { .. } => ("PAYLOAD_TOO_LARGE", false, LogLevel::Debug),
        AppError::UnsupportedFormat(_) => ("UNSUPPORTED_FORMAT", false, LogLevel::Debug),
        AppError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        AppError::StorageUnavailable => ("STORAGE_UNAVAILABLE", false, LogLevel::Warn),
        AppError::Classifier(_) => ("CLASSIFIER_ERROR", true, LogLevel::Warn),
        AppError::Config(_) => ("CONFIG_ERROR", false, LogLevel::Error),
        AppError::Internal(_) => ("INTERNAL_ERROR", true, LogLevel::Error),
        AppError::InternalWithSource { .. } => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl AppError {
    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge { max, .. } => {
                format!("Video file is too large. Maximum size is {} MB", max / (1024 * 1024))
            }
            AppError::UnsupportedFormat(ref ext) => {
                format!("Unsupported video format: {}", ext)
            }
            AppError::Storage(_) => "Failed to access video storage".to_string(),
            AppError::StorageUnavailable => {
                "Video storage is not available on this device".to_string()
            }
            AppError::Classifier(_) => "Content analysis is temporarily unavailable".to_string(),
            AppError::Config(_) => "Service is misconfigured".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}
