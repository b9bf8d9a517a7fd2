use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

/// HTTP client for the hosted inference API.
///
/// Every model is addressed as `{base_url}/{model}` and receives
/// `{"inputs": ...}`. The bearer token is never logged.
#[derive(Clone)]
pub struct InferenceClient {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Debug for InferenceClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InferenceClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl InferenceClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for inference API")?;

        Ok(InferenceClient {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model.trim_start_matches('/'))
    }

    /// POST `{"inputs": inputs}` to a model and return the decoded JSON body
    pub async fn infer(&self, model: &str, inputs: Value) -> Result<Value> {
        let url = self.model_url(model);
        let start = std::time::Instant::now();

        let mut request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&json!({ "inputs": inputs }));

        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to model {}", model))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Inference request to {} failed: {} - {}",
                model,
                status,
                error_text
            ));
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from model {}", model))?;

        tracing::debug!(
            model = %model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Inference call succeeded"
        );

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn sends_bearer_token_and_inputs() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/org/model")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::Json(json!({"inputs": "hello"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"label": "POSITIVE", "score": 0.9}]"#)
            .create_async()
            .await;

        let client = InferenceClient::new(
            format!("{}/", server.url()),
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let body = client.infer("org/model", json!("hello")).await.unwrap();
        assert_eq!(body[0]["label"], "POSITIVE");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/org/model")
            .with_status(503)
            .with_body(r#"{"error": "Model is currently loading"}"#)
            .create_async()
            .await;

        let client = InferenceClient::new(server.url(), None, Duration::from_secs(5)).unwrap();
        let err = client.infer("org/model", json!("hi")).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn debug_output_redacts_token() {
        let client = InferenceClient::new(
            "http://localhost",
            Some("secret".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
