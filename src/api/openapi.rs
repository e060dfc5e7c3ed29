//! OpenAPI specification endpoints

use actix_web::{HttpResponse, Responder, get};
use utoipa::OpenApi;

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::health::{HealthStatus, ReadinessStatus};
use crate::api::report::{ReportResponse, ReportUploadForm};
use crate::model::{ReportMode, UploadSummary};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Meter Inspector API",
        description = "Generates inspection reports from photos of electrical meters"
    ),
    paths(
        crate::api::report::generate_report,
        crate::api::health::liveness,
        crate::api::health::readiness,
    ),
    components(schemas(
        ReportResponse,
        ReportUploadForm,
        ReportMode,
        UploadSummary,
        ErrorResponse,
        HealthStatus,
        ReadinessStatus,
    )),
    tags(
        (name = "reports", description = "Meter report generation"),
        (name = "health", description = "Health checks")
    )
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
#[get("/openapi.json")]
pub async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

/// Serve OpenAPI YAML specification
#[get("/openapi.yaml")]
pub async fn openapi_yaml() -> Result<HttpResponse, ApiError> {
    let yaml = ApiDoc::openapi()
        .to_yaml()
        .map_err(|e| ApiError::Internal(format!("failed to render OpenAPI YAML: {}", e)))?;

    Ok(HttpResponse::Ok().content_type("text/yaml").body(yaml))
}

/// Configure OpenAPI routes
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(openapi_json).service(openapi_yaml);
}
