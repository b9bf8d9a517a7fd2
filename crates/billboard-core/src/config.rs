//! Configuration module
//!
//! Settings for local video storage, the remote classifier endpoints, the
//! booking backend and notification delivery. Values come from the process
//! environment (after loading `.env`), falling back to the defaults below.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_VIDEO_EXTENSIONS, MAX_VIDEO_SIZE_BYTES};

const STORAGE_ROOT: &str = "./data";
const INFERENCE_API_URL: &str = "https://api-inference.huggingface.co/models";
const IMAGE_MODELS: &str = "Falconsai/nsfw_image_detection";
const TEXT_MODELS: &str = "unitary/toxic-bert,cardiffnlp/twitter-roberta-base-sentiment-latest";
const TRANSCRIPTION_MODEL: &str = "openai/whisper-base";
const CLASSIFIER_TIMEOUT_SECS: u64 = 20;
const ANALYSIS_TIMEOUT_SECS: u64 = 120;
const FRAME_COUNT: usize = 3;
const BOOKING_SYNC_RETRIES: u32 = 1;
const PROGRESS_TICK_MS: u64 = 500;
const SMTP_PORT: u16 = 587;

/// Moderation pipeline configuration
#[derive(Clone, Debug)]
pub struct ModerationConfig {
    pub environment: String,
    // Local video storage
    pub storage_root: PathBuf,
    pub filesystem_enabled: bool,
    pub max_video_size_bytes: u64,
    pub video_allowed_extensions: Vec<String>,
    // Classifier endpoints
    pub inference_api_url: String,
    pub inference_api_token: Option<String>,
    pub image_models: Vec<String>,
    pub text_models: Vec<String>,
    pub transcription_model: Option<String>,
    pub ocr_model: Option<String>,
    pub classifier_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
    pub frame_count: usize,
    pub ffmpeg_path: Option<String>,
    /// When every classifier call fails, hold the video for manual review
    /// instead of scoring it as clean.
    pub treat_outage_as_pending: bool,
    // Booking backend
    pub booking_api_url: Option<String>,
    pub booking_api_token: Option<String>,
    pub booking_sync_retries: u32,
    // Session controller
    pub progress_tick_ms: u64,
    // Email notifications
    pub email_notifications_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            storage_root: PathBuf::from(STORAGE_ROOT),
            filesystem_enabled: true,
            max_video_size_bytes: MAX_VIDEO_SIZE_BYTES,
            video_allowed_extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            inference_api_url: INFERENCE_API_URL.to_string(),
            inference_api_token: None,
            image_models: split_list(IMAGE_MODELS),
            text_models: split_list(TEXT_MODELS),
            transcription_model: Some(TRANSCRIPTION_MODEL.to_string()),
            ocr_model: None,
            classifier_timeout_secs: CLASSIFIER_TIMEOUT_SECS,
            analysis_timeout_secs: ANALYSIS_TIMEOUT_SECS,
            frame_count: FRAME_COUNT,
            ffmpeg_path: None,
            treat_outage_as_pending: true,
            booking_api_url: None,
            booking_api_token: None,
            booking_sync_retries: BOOKING_SYNC_RETRIES,
            progress_tick_ms: PROGRESS_TICK_MS,
            email_notifications_enabled: false,
            smtp_host: None,
            smtp_port: SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().to_lowercase().parse().ok())
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl ModerationConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let transcription_model = match env::var("TRANSCRIPTION_MODEL") {
            Ok(value) if value.trim().is_empty() => None,
            Ok(value) => Some(value.trim().to_string()),
            Err(_) => defaults.transcription_model.clone(),
        };

        let config = ModerationConfig {
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or(defaults.environment),
            storage_root: env_opt("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            filesystem_enabled: env_bool("FILESYSTEM_ENABLED", defaults.filesystem_enabled),
            max_video_size_bytes: env::var("MAX_VIDEO_SIZE_MB")
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(defaults.max_video_size_bytes),
            video_allowed_extensions: env_opt("VIDEO_ALLOWED_EXTENSIONS")
                .map(|s| {
                    split_list(&s)
                        .into_iter()
                        .map(|ext| ext.trim_start_matches('.').to_lowercase())
                        .collect()
                })
                .unwrap_or(defaults.video_allowed_extensions),
            inference_api_url: env_opt("INFERENCE_API_URL").unwrap_or(defaults.inference_api_url),
            inference_api_token: env_opt("INFERENCE_API_TOKEN"),
            image_models: env::var("IMAGE_MODELS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.image_models),
            text_models: env::var("TEXT_MODELS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.text_models),
            transcription_model,
            ocr_model: env_opt("OCR_MODEL"),
            classifier_timeout_secs: env_parse(
                "CLASSIFIER_TIMEOUT_SECS",
                defaults.classifier_timeout_secs,
            ),
            analysis_timeout_secs: env_parse("ANALYSIS_TIMEOUT_SECS", defaults.analysis_timeout_secs),
            frame_count: env_parse("FRAME_COUNT", defaults.frame_count),
            ffmpeg_path: env_opt("FFMPEG_PATH"),
            treat_outage_as_pending: env_bool(
                "TREAT_OUTAGE_AS_PENDING",
                defaults.treat_outage_as_pending,
            ),
            booking_api_url: env_opt("BOOKING_API_URL"),
            booking_api_token: env_opt("BOOKING_API_TOKEN"),
            booking_sync_retries: env_parse("BOOKING_SYNC_RETRIES", defaults.booking_sync_retries),
            progress_tick_ms: env_parse("PROGRESS_TICK_MS", defaults.progress_tick_ms),
            email_notifications_enabled: env_bool(
                "EMAIL_NOTIFICATIONS_ENABLED",
                defaults.email_notifications_enabled,
            ),
            smtp_host: env_opt("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0)
                .unwrap_or(defaults.smtp_port),
            smtp_user: env_opt("SMTP_USER"),
            smtp_password: env_opt("SMTP_PASSWORD"),
            smtp_from: env_opt("SMTP_FROM"),
            smtp_tls: env_bool("SMTP_TLS", defaults.smtp_tls),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be greater than zero"));
        }

        if self.video_allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "VIDEO_ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }

        if self.frame_count == 0 {
            return Err(anyhow::anyhow!("FRAME_COUNT must be at least 1"));
        }

        if self.classifier_timeout_secs == 0 || self.analysis_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "CLASSIFIER_TIMEOUT_SECS and ANALYSIS_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.progress_tick_ms == 0 {
            return Err(anyhow::anyhow!("PROGRESS_TICK_MS must be greater than zero"));
        }

        if self.email_notifications_enabled && (self.smtp_host.is_none() || self.smtp_from.is_none())
        {
            return Err(anyhow::anyhow!(
                "EMAIL_NOTIFICATIONS_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ModerationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_video_size_bytes, 100 * 1024 * 1024);
        assert_eq!(
            config.video_allowed_extensions,
            vec!["mp4", "mov", "avi", "mkv", "m4v"]
        );
        assert_eq!(config.frame_count, 3);
        assert!(config.treat_outage_as_pending);
    }

    #[test]
    fn email_requires_smtp_settings() {
        let config = ModerationConfig {
            email_notifications_enabled: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ModerationConfig {
            email_notifications_enabled: true,
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_from: Some("noreply@example.com".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_frame_count_is_rejected() {
        let config = ModerationConfig {
            frame_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(" a, ,b ,"), vec!["a", "b"]);
        assert!(split_list("").is_empty());
    }
}
