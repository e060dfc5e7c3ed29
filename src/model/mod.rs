pub mod config;
pub mod gemini;
pub mod report;

pub use config::{Config, CorsConfig, GeminiConfig, UploadLimits};
pub use report::{ExtractedReport, ImageUpload, MeterReport, ReportMode, UploadSummary};
