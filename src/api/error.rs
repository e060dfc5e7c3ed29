//! Unified API error handling
//!
//! This module provides a consistent error response format across all API endpoints.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::service::extract::MalformedOutput;
use crate::service::gemini::UpstreamError;
use crate::service::report::ReportError;

/// Standard error response format
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Unique request ID for tracing
    pub request_id: String,
    /// Unparsed model output, present when the reply held no valid report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Unified API error type
///
/// All API endpoints should return `Result<T, ApiError>` for consistent error handling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Bad request / validation error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload exceeds configured limits (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Model reply held no valid report (502)
    #[error("{0}")]
    MalformedOutput(MalformedOutput),

    /// Upstream unreachable or timed out (502/504)
    #[error("Upstream transport error: {message}")]
    UpstreamTransport { message: String, timeout: bool },

    /// Upstream answered with an error status (502)
    #[error("Upstream status error: {0}")]
    UpstreamStatus(String),

    /// Upstream answered without usable text (502)
    #[error("Upstream empty response: {0}")]
    UpstreamEmpty(String),

    /// Upstream body was not the expected JSON envelope (502)
    #[error("Upstream decode error: {0}")]
    UpstreamDecode(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::MalformedOutput(_) => "malformed_output",
            ApiError::UpstreamTransport { .. } => "upstream_transport_error",
            ApiError::UpstreamStatus(_) => "upstream_status_error",
            ApiError::UpstreamEmpty(_) => "upstream_empty_response",
            ApiError::UpstreamDecode(_) => "upstream_decode_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UpstreamTransport { timeout: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::MalformedOutput(_)
            | ApiError::UpstreamTransport { .. }
            | ApiError::UpstreamStatus(_)
            | ApiError::UpstreamEmpty(_)
            | ApiError::UpstreamDecode(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_type = self.error_type();

        if status.is_server_error() {
            tracing::error!(
                error_type = error_type,
                status = status.as_u16(),
                message = %self,
                "API error"
            );
        } else {
            tracing::warn!(
                error_type = error_type,
                status = status.as_u16(),
                message = %self,
                "API request rejected"
            );
        }

        let raw_output = match self {
            ApiError::MalformedOutput(e) => Some(e.raw.clone()),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            request_id: Uuid::new_v4().to_string(),
            raw_output,
        })
    }
}

// ============================================================================
// From conversions for service errors
// ============================================================================

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NoImages => ApiError::BadRequest(err.to_string()),
            ReportError::MalformedOutput(e) => ApiError::MalformedOutput(e),
            ReportError::UpstreamTransport(e) => ApiError::UpstreamTransport {
                timeout: e.is_timeout(),
                message: e.to_string(),
            },
            ReportError::UpstreamStatus(e) => ApiError::UpstreamStatus(e.to_string()),
            ReportError::UpstreamEmpty(e) => ApiError::UpstreamEmpty(e.to_string()),
            ReportError::UpstreamDecode(e) => ApiError::UpstreamDecode(e.to_string()),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        ReportError::from(err).into()
    }
}
