//! REST API endpoint for meter reports

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, post, web};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ErrorResponse};
use crate::model::{ImageUpload, ReportMode, UploadLimits, UploadSummary};
use crate::service::ReportService;
use crate::service::report::ReportOutcome;

/// Query parameters for report generation
#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// `json` (default) returns the parsed report, `text` the raw model reply
    #[param(inline)]
    pub mode: Option<ReportMode>,
}

/// Multipart form accepted by the report endpoint
#[derive(ToSchema)]
#[allow(dead_code)] // Documentation only
pub struct ReportUploadForm {
    /// Meter image. Repeat the field to send several images of the same meter.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Response for a generated report
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportResponse {
    /// Uploaded images, in request order
    pub files: Vec<UploadSummary>,
    /// Parsed report (json mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub report: Option<serde_json::Map<String, serde_json::Value>>,
    /// Raw model reply (text mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Generate an inspection report from one or more meter images
#[utoipa::path(
    post,
    path = "/api/gemini-report",
    params(ReportQuery),
    request_body(content = ReportUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Report generated", body = ReportResponse),
        (status = 400, description = "No image or unsupported file type", body = ErrorResponse),
        (status = 413, description = "Image too large or too many images", body = ErrorResponse),
        (status = 502, description = "Upstream failure or malformed model output", body = ErrorResponse),
        (status = 504, description = "Upstream timed out", body = ErrorResponse)
    ),
    tag = "reports"
)]
#[post("/api/gemini-report")]
pub async fn generate_report(
    service: web::Data<ReportService>,
    limits: web::Data<UploadLimits>,
    query: web::Query<ReportQuery>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mode = query.mode.unwrap_or_default();
    let uploads = read_uploads(payload, limits.get_ref()).await?;

    if uploads.is_empty() {
        return Err(ApiError::BadRequest(
            "expected at least one image file in the multipart form".to_string(),
        ));
    }

    let files: Vec<UploadSummary> = uploads.iter().map(ImageUpload::summary).collect();

    tracing::info!(
        image_count = uploads.len(),
        total_bytes = uploads.iter().map(|u| u.bytes.len()).sum::<usize>(),
        mode = ?mode,
        "Received meter report request"
    );

    let response = match service.generate(&uploads, mode).await? {
        ReportOutcome::Report(report) => ReportResponse {
            files,
            report: Some(report),
            message: None,
        },
        ReportOutcome::Text(message) => ReportResponse {
            files,
            report: None,
            message: Some(message),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Collect every file field of the form as an image upload
async fn read_uploads(
    mut payload: Multipart,
    limits: &UploadLimits,
) -> Result<Vec<ImageUpload>, ApiError> {
    let mut uploads = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?;

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let Some(filename) = filename else {
            // Plain form values are not images
            drain(&mut field).await?;
            continue;
        };

        if uploads.len() >= limits.max_files {
            return Err(ApiError::PayloadTooLarge(format!(
                "at most {} images are accepted per request",
                limits.max_files
            )));
        }

        let mime_type = match field.content_type() {
            Some(ct) if ct.type_().as_str() == "image" => ct.essence_str().to_string(),
            other => {
                return Err(ApiError::BadRequest(format!(
                    "file '{}' has unsupported content type '{}'",
                    filename,
                    other.map(|ct| ct.essence_str()).unwrap_or("unknown")
                )));
            }
        };

        let bytes = read_field(&mut field, &filename, limits.max_file_bytes).await?;

        if bytes.is_empty() {
            return Err(ApiError::BadRequest(format!("file '{}' is empty", filename)));
        }

        uploads.push(ImageUpload {
            filename: Some(filename),
            mime_type,
            bytes,
        });
    }

    Ok(uploads)
}

async fn read_field(
    field: &mut Field,
    filename: &str,
    max_bytes: usize,
) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| {
            ApiError::BadRequest(format!("failed to read '{}': {}", filename, e))
        })?;
        if bytes.len() + chunk.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "file '{}' exceeds the {} byte limit",
                filename, max_bytes
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

async fn drain(field: &mut Field) -> Result<(), ApiError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?;
    }
    Ok(())
}

/// Configure report routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(generate_report);
}
