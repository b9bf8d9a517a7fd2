//! HTTP client for the booking backend.
//!
//! Provides a minimal client with bearer auth, a JSON PATCH helper, and the
//! booking-update call the moderation pipeline makes once a decision exists.

pub mod booking;

pub use booking::{BookingApiClient, BookingBackend};

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

/// Authentication strategy for the backend.
#[derive(Clone)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credentials (local development backends)
    Anonymous,
}

impl Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer([redacted])"),
            Auth::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// HTTP client for the booking backend with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        Self::with_timeout(base_url, auth, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Anonymous => request,
        }
    }

    /// PATCH a JSON body. Returns the decoded response, or `Value::Null` for
    /// an empty body.
    pub async fn patch_json<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self.build_url(path);
        let request = self.client.patch(&url).json(body);
        let request = self.apply_auth(request);

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let text = response
            .text()
            .await
            .context("Failed to read response body")?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).context("Failed to parse response as JSON")
    }
}
