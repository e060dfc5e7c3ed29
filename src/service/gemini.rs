//! Gemini `generateContent` client
//!
//! Sends prompt and inline image parts to the vision-language model and
//! returns the concatenated reply text.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;

use crate::model::GeminiConfig;
use crate::model::gemini::{GenerateContentRequest, GenerateContentResponse};

const API_KEY_HEADER: &str = "x-goog-api-key";
/// Upper bound on the upstream error body kept in errors and logs
const MAX_ERROR_BODY: usize = 2048;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Connection, TLS, or timeout failure before a response arrived
    #[error("Upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-success HTTP status from the upstream service
    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response decoded but carried no text
    #[error("Upstream returned no text{}", blocked_suffix(.block_reason))]
    EmptyResponse { block_reason: Option<String> },

    /// Response body was not the expected JSON envelope
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),
}

fn blocked_suffix(block_reason: &Option<String>) -> String {
    block_reason
        .as_ref()
        .map(|r| format!(" (blocked: {})", r))
        .unwrap_or_default()
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Transport(e) if e.is_timeout())
    }
}

/// Backend that turns a generation request into raw model output
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, UpstreamError>;

    /// Model identifier, for logging and health reporting
    fn model(&self) -> &str;
}

/// HTTP client for the Gemini API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn new(config: &GeminiConfig, api_key: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, UpstreamError> {
        let start_time = Instant::now();
        let url = self.endpoint();

        tracing::debug!(model = %self.model, url = %url, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    timeout = e.is_timeout(),
                    error = %e,
                    "generateContent request failed"
                );
                UpstreamError::Transport(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            tracing::error!(
                model = %self.model,
                status = status.as_u16(),
                elapsed_ms = start_time.elapsed().as_millis(),
                "generateContent returned an error status"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let Some(text) = parsed.text() else {
            let block_reason = parsed.block_reason().map(str::to_string);
            tracing::warn!(
                model = %self.model,
                block_reason = ?block_reason,
                finish_reason = ?parsed.finish_reason(),
                "generateContent returned no text"
            );
            return Err(UpstreamError::EmptyResponse { block_reason });
        };

        tracing::info!(
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis(),
            output_length = text.len(),
            finish_reason = ?parsed.finish_reason(),
            "generateContent completed"
        );

        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
