//! Application state and service initialization
//!
//! This module centralizes service initialization and dependency injection,
//! making it easier to manage the application lifecycle and test services.

use std::sync::Arc;

use crate::model::{Config, CorsConfig, UploadLimits};
use crate::service::{GeminiClient, ReportService};

/// Application state containing all services and shared resources
pub struct AppState {
    /// Meter report generation service
    pub report_service: Arc<ReportService>,
    /// Upload limits enforced by the report endpoint
    pub limits: UploadLimits,
    /// CORS policy
    pub cors: CorsConfig,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// Requires `GEMINI_API_KEY` and a valid `GEMINI_BASE_URL`.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let api_key = config
            .gemini
            .api_key
            .as_deref()
            .ok_or(AppError::MissingConfig("GEMINI_API_KEY"))?;

        config
            .gemini
            .base_url()
            .map_err(|_| AppError::InvalidConfig("GEMINI_BASE_URL is not a valid URL"))?;

        if config.limits.max_files == 0 || config.limits.max_file_bytes == 0 {
            return Err(AppError::InvalidConfig(
                "METER_MAX_FILES and METER_MAX_UPLOAD_BYTES must be greater than zero",
            ));
        }

        let client = GeminiClient::new(&config.gemini, api_key)
            .map_err(|e| AppError::HttpClient(e.to_string()))?;

        let report_service = Arc::new(ReportService::new(Arc::new(client), config.prompt));

        Ok(Self {
            report_service,
            limits: config.limits,
            cors: config.cors,
        })
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Outbound HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
