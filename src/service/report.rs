//! Meter report generation service
//!
//! Turns uploaded meter images into a single generation request and extracts
//! the report from the reply.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::model::gemini::{Content, GenerateContentRequest, GenerationConfig, InlineData, Part};
use crate::model::{ExtractedReport, ImageUpload, ReportMode};
use crate::service::extract::{MalformedOutput, extract};
use crate::service::gemini::{GenerationBackend, UpstreamError};
use crate::service::prompts::build_inspection_prompt;

/// Error type for report generation
///
/// Variants are kept distinct so callers can retry upstream failures while
/// treating malformed output separately.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error("No images were provided")]
    NoImages,

    #[error(transparent)]
    MalformedOutput(#[from] MalformedOutput),

    #[error("Upstream transport error: {0}")]
    UpstreamTransport(#[source] UpstreamError),

    #[error("Upstream status error: {0}")]
    UpstreamStatus(#[source] UpstreamError),

    #[error("Upstream returned an empty response: {0}")]
    UpstreamEmpty(#[source] UpstreamError),

    #[error("Upstream response could not be decoded: {0}")]
    UpstreamDecode(#[source] UpstreamError),
}

impl From<UpstreamError> for ReportError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Transport(_) => ReportError::UpstreamTransport(err),
            UpstreamError::Status { .. } => ReportError::UpstreamStatus(err),
            UpstreamError::EmptyResponse { .. } => ReportError::UpstreamEmpty(err),
            UpstreamError::Decode(_) => ReportError::UpstreamDecode(err),
        }
    }
}

/// Result of a report request
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    /// Report parsed from the model reply
    Report(ExtractedReport),
    /// Raw reply text, returned when the caller asked for text
    Text(String),
}

/// Service for generating meter inspection reports
pub struct ReportService {
    backend: Arc<dyn GenerationBackend>,
    prompt: Option<String>,
}

impl ReportService {
    /// Create a new report service
    ///
    /// `prompt` replaces the built-in inspection instructions when set.
    pub fn new(backend: Arc<dyn GenerationBackend>, prompt: Option<String>) -> Self {
        tracing::info!(
            model = %backend.model(),
            custom_prompt = prompt.is_some(),
            "Report service initialized"
        );
        Self { backend, prompt }
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Generate a report for one or more images of the same meter
    pub async fn generate(
        &self,
        uploads: &[ImageUpload],
        mode: ReportMode,
    ) -> Result<ReportOutcome, ReportError> {
        if uploads.is_empty() {
            return Err(ReportError::NoImages);
        }

        let start_time = std::time::Instant::now();
        let request = self.build_request(uploads, mode);

        tracing::debug!(
            model = %self.backend.model(),
            image_count = uploads.len(),
            mode = ?mode,
            "Requesting meter report"
        );

        let raw = self.backend.generate(&request).await?;

        let outcome = match mode {
            ReportMode::Text => ReportOutcome::Text(raw),
            ReportMode::Json => match extract(&raw) {
                Ok(report) => ReportOutcome::Report(report),
                Err(e) => {
                    tracing::warn!(
                        model = %self.backend.model(),
                        reason = %e.reason,
                        raw_length = e.raw.len(),
                        "Model output did not contain a valid report"
                    );
                    return Err(e.into());
                }
            },
        };

        tracing::info!(
            model = %self.backend.model(),
            image_count = uploads.len(),
            elapsed_ms = start_time.elapsed().as_millis(),
            "Meter report generated"
        );

        Ok(outcome)
    }

    fn build_request(&self, uploads: &[ImageUpload], mode: ReportMode) -> GenerateContentRequest {
        let with_schema = mode == ReportMode::Json;
        let prompt = build_inspection_prompt(self.prompt.as_deref(), uploads.len(), with_schema);

        let mut parts = Vec::with_capacity(uploads.len() + 1);
        parts.push(Part::Text(prompt));
        parts.extend(uploads.iter().map(|upload| {
            Part::InlineData(InlineData {
                mime_type: upload.mime_type.clone(),
                data: STANDARD.encode(&upload.bytes),
            })
        }));

        let generation_config = with_schema.then(|| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
        });

        GenerateContentRequest {
            contents: vec![Content { role: None, parts }],
            generation_config,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// Backend returning a canned reply and recording requests
    pub(crate) struct FakeBackend {
        reply: Result<String, fn() -> UpstreamError>,
        pub(crate) requests: Mutex<Vec<serde_json::Value>>,
    }

    impl FakeBackend {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(err: fn() -> UpstreamError) -> Self {
            Self {
                reply: Err(err),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeBackend {
        async fn generate(
            &self,
            request: &GenerateContentRequest,
        ) -> Result<String, UpstreamError> {
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn upload(bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            filename: Some("medidor.jpg".to_string()),
            mime_type: "image/jpeg".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_generate_extracts_report() {
        let backend = Arc::new(FakeBackend::replying(
            "```json\n{\"tipoMedidor\": \"Digital\", \"cablesConectados\": 3}\n```",
        ));
        let service = ReportService::new(backend.clone(), None);

        let outcome = service
            .generate(&[upload(b"hello")], ReportMode::Json)
            .await
            .unwrap();

        let ReportOutcome::Report(report) = outcome else {
            panic!("expected report");
        };
        assert_eq!(report["tipoMedidor"], "Digital");
        assert_eq!(report["cablesConectados"], 3);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let parts = &requests[0]["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("tipoMedidor"));
        assert_eq!(
            parts[1],
            json!({"inlineData": {"mimeType": "image/jpeg", "data": "aGVsbG8="}})
        );
        assert_eq!(
            requests[0]["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_generate_sends_one_part_per_image() {
        let backend = Arc::new(FakeBackend::replying("{}"));
        let service = ReportService::new(backend.clone(), Some("Custom".to_string()));

        service
            .generate(&[upload(b"a"), upload(b"b"), upload(b"c")], ReportMode::Json)
            .await
            .unwrap();

        let requests = backend.requests.lock().unwrap();
        let parts = requests[0]["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 4);
        assert!(parts[0]["text"].as_str().unwrap().starts_with("Custom"));
    }

    #[tokio::test]
    async fn test_text_mode_returns_raw_output() {
        let backend = Arc::new(FakeBackend::replying("El medidor es digital."));
        let service = ReportService::new(backend.clone(), None);

        let outcome = service
            .generate(&[upload(b"x")], ReportMode::Text)
            .await
            .unwrap();

        assert_eq!(outcome, ReportOutcome::Text("El medidor es digital.".to_string()));
        let requests = backend.requests.lock().unwrap();
        assert!(requests[0].get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_malformed_output_is_surfaced() {
        let backend = Arc::new(FakeBackend::replying("No puedo analizar esta imagen."));
        let service = ReportService::new(backend, None);

        let err = service
            .generate(&[upload(b"x")], ReportMode::Json)
            .await
            .unwrap_err();

        match err {
            ReportError::MalformedOutput(e) => assert_eq!(e.raw, "No puedo analizar esta imagen."),
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_images_is_rejected_without_upstream_call() {
        let backend = Arc::new(FakeBackend::replying("{}"));
        let service = ReportService::new(backend.clone(), None);

        let err = service.generate(&[], ReportMode::Json).await.unwrap_err();

        assert!(matches!(err, ReportError::NoImages));
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_errors_keep_their_kind() {
        let backend = Arc::new(FakeBackend::failing(|| UpstreamError::Status {
            status: 503,
            body: "unavailable".to_string(),
        }));
        let service = ReportService::new(backend, None);
        let err = service
            .generate(&[upload(b"x")], ReportMode::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::UpstreamStatus(_)));

        let backend = Arc::new(FakeBackend::failing(|| UpstreamError::EmptyResponse {
            block_reason: None,
        }));
        let service = ReportService::new(backend, None);
        let err = service
            .generate(&[upload(b"x")], ReportMode::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::UpstreamEmpty(_)));

        let backend = Arc::new(FakeBackend::failing(|| {
            UpstreamError::Decode("expected value at line 1 column 1".to_string())
        }));
        let service = ReportService::new(backend, None);
        let err = service
            .generate(&[upload(b"x")], ReportMode::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::UpstreamDecode(_)));
    }
}
