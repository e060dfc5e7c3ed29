//! Meter inspection report models

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Report extracted from the model reply.
///
/// Kept as a loose JSON object: fields follow [`MeterReport`] but extra or
/// missing keys are passed through untouched.
pub type ExtractedReport = serde_json::Map<String, serde_json::Value>;

/// Report layout the model is asked to produce
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(description = "Inspection report for a photographed electrical meter")]
pub struct MeterReport {
    #[serde(rename = "tipoMedidor")]
    #[schemars(description = "Meter type, e.g. 'Digital', 'Analógico', 'Electromecánico'")]
    pub tipo_medidor: String,

    #[serde(rename = "cablesConectados")]
    #[schemars(description = "Number of visible connected cables, null when it cannot be determined")]
    pub cables_conectados: Option<u32>,

    #[serde(rename = "estadoGeneralVisible")]
    #[schemars(description = "Visible general condition of the meter and its enclosure")]
    pub estado_general_visible: String,

    #[serde(rename = "anomaliasDetectadas")]
    #[schemars(description = "Anomalies or signs of tampering. Empty list when none are visible")]
    pub anomalias_detectadas: Vec<String>,

    #[serde(rename = "conclusionGeneral", default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Short overall conclusion of the inspection")]
    pub conclusion_general: Option<String>,
}

/// How the model reply is returned to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Parse the JSON object embedded in the reply
    #[default]
    Json,
    /// Return the reply text unparsed
    Text,
}

/// A single uploaded image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn summary(&self) -> UploadSummary {
        UploadSummary {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size_kb: size_kb(self.bytes.len()),
        }
    }
}

/// Upload metadata echoed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadSummary {
    pub filename: Option<String>,
    pub mime_type: String,
    /// Size in KiB, rounded to one decimal
    pub size_kb: f64,
}

fn size_kb(len: usize) -> f64 {
    (len as f64 / 1024.0 * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_kb_rounds_to_one_decimal() {
        assert_eq!(size_kb(0), 0.0);
        assert_eq!(size_kb(1024), 1.0);
        assert_eq!(size_kb(1536), 1.5);
        assert_eq!(size_kb(1100), 1.1);
    }

    #[test]
    fn test_meter_report_uses_camel_case_field_names() {
        let report = MeterReport {
            tipo_medidor: "Digital".to_string(),
            cables_conectados: Some(3),
            estado_general_visible: "Bueno".to_string(),
            anomalias_detectadas: vec![],
            conclusion_general: None,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["tipoMedidor"], "Digital");
        assert_eq!(value["cablesConectados"], 3);
        assert!(value.get("conclusionGeneral").is_none());
    }

    #[test]
    fn test_report_mode_deserializes_from_snake_case() {
        let mode: ReportMode = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(mode, ReportMode::Text);
        assert_eq!(ReportMode::default(), ReportMode::Json);
    }
}
