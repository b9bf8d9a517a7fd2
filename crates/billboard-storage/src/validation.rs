//! Validation of videos submitted to the store.
//!
//! Every check runs before anything is copied, so a rejected submission never
//! leaves a binary or an index entry behind.

use std::path::Path;
use thiserror::Error;

use crate::traits::StorageError;

/// Reasons `store_video` can fail. Each validation failure has its own
/// message so the caller can show it directly.
#[derive(Debug, Error)]
pub enum StoreVideoError {
    #[error("Video file not found: {0}")]
    SourceMissing(String),

    #[error("Video file is empty")]
    EmptyFile,

    #[error("Video file is too large ({size_mb:.1} MB). Maximum size is {max_mb} MB")]
    TooLarge { size_mb: f64, max_mb: u64 },

    #[error("Unsupported video format: {extension}. Allowed formats: {allowed}")]
    UnsupportedFormat { extension: String, allowed: String },

    #[error("Invalid booking id: {0}")]
    InvalidBookingId(String),

    #[error("Video storage is not available on this platform")]
    Unavailable,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<StoreVideoError> for billboard_core::AppError {
    fn from(err: StoreVideoError) -> Self {
        use billboard_core::AppError;
        match err {
            StoreVideoError::SourceMissing(path) => AppError::NotFound(path),
            StoreVideoError::EmptyFile | StoreVideoError::InvalidBookingId(_) => {
                AppError::InvalidInput(err.to_string())
            }
            StoreVideoError::TooLarge { size_mb, max_mb } => AppError::PayloadTooLarge {
                size: (size_mb * 1024.0 * 1024.0) as u64,
                max: max_mb * 1024 * 1024,
            },
            StoreVideoError::UnsupportedFormat { extension, .. } => {
                AppError::UnsupportedFormat(extension)
            }
            StoreVideoError::Unavailable => AppError::StorageUnavailable,
            StoreVideoError::Storage(e) => e.into(),
        }
    }
}

/// Lower-cased extension of a file name, if any
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
}

/// Validate the size of a source file against the store cap
pub fn validate_size(size: u64, max_size_bytes: u64) -> Result<(), StoreVideoError> {
    if size == 0 {
        return Err(StoreVideoError::EmptyFile);
    }

    if size > max_size_bytes {
        return Err(StoreVideoError::TooLarge {
            size_mb: size as f64 / (1024.0 * 1024.0),
            max_mb: max_size_bytes / (1024 * 1024),
        });
    }

    Ok(())
}

/// Validate the extension of `name` against the allow-list, returning the
/// normalized extension.
pub fn validate_extension(name: &str, allowed: &[String]) -> Result<String, StoreVideoError> {
    let extension = file_extension(name).unwrap_or_default();

    if extension.is_empty() || !allowed.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        return Err(StoreVideoError::UnsupportedFormat {
            extension: if extension.is_empty() {
                "(none)".to_string()
            } else {
                extension
            },
            allowed: allowed.join(", "),
        });
    }

    Ok(extension)
}

/// Booking ids become part of the stored file name, so they must be a single
/// path component.
pub fn validate_booking_id(booking_id: &str) -> Result<(), StoreVideoError> {
    // Stored verbatim and matched exactly, so surrounding whitespace is refused
    // rather than trimmed away.
    if booking_id.trim().is_empty()
        || booking_id.trim() != booking_id
        || booking_id.contains("..")
        || booking_id.contains('/')
        || booking_id.contains('\\')
        || booking_id.contains('\0')
    {
        return Err(StoreVideoError::InvalidBookingId(booking_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["mp4", "mov", "avi", "mkv", "m4v"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(validate_extension("AD.MP4", &allowed()).unwrap(), "mp4");
        assert_eq!(validate_extension("clip.m4v", &allowed()).unwrap(), "m4v");
    }

    #[test]
    fn disallowed_or_missing_extension_is_rejected() {
        let err = validate_extension("clip.webm", &allowed()).unwrap_err();
        assert!(err.to_string().contains("webm"));
        assert!(err.to_string().contains("mp4, mov"));

        assert!(matches!(
            validate_extension("clip", &allowed()),
            Err(StoreVideoError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn size_bounds() {
        let max = 100 * 1024 * 1024;
        assert!(matches!(validate_size(0, max), Err(StoreVideoError::EmptyFile)));
        assert!(validate_size(1, max).is_ok());
        assert!(validate_size(max, max).is_ok());

        let err = validate_size(max + 1, max).unwrap_err();
        assert!(err.to_string().contains("Maximum size is 100 MB"));
    }

    #[test]
    fn booking_ids_cannot_escape_the_videos_dir() {
        assert!(validate_booking_id("booking-42").is_ok());
        assert!(validate_booking_id("").is_err());
        assert!(validate_booking_id("../etc").is_err());
        assert!(validate_booking_id("a/b").is_err());
        assert!(validate_booking_id("a\\b").is_err());
        assert!(validate_booking_id(" b1").is_err());
        assert!(validate_booking_id("b1\n").is_err());
    }
}
