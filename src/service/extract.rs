//! Extraction of a JSON object embedded in free-form model output
//!
//! Models asked for "JSON only" still wrap replies in prose or markdown code
//! fences. The extractor takes the span from the first `{` to the last `}` and
//! parses it. Unescaped braces in the surrounding prose are not handled.

use crate::model::ExtractedReport;

/// Why no report could be extracted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    /// No `{` ... `}` span in the text
    #[error("no JSON object found")]
    NoObject,
    /// The span did not parse as a JSON object
    #[error("{message} (line {line}, column {column})")]
    InvalidJson {
        message: String,
        line: usize,
        column: usize,
    },
}

/// The model output did not contain a valid JSON object
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed model output: {reason}")]
pub struct MalformedOutput {
    pub reason: MalformedReason,
    /// The full text that was handed to the extractor
    pub raw: String,
    /// The `{` ... `}` span that failed to parse, if one was found
    pub candidate: Option<String>,
}

/// Extract the JSON object embedded in `raw`
pub fn extract(raw: &str) -> Result<ExtractedReport, MalformedOutput> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(MalformedOutput {
            reason: MalformedReason::NoObject,
            raw: raw.to_string(),
            candidate: None,
        });
    };

    if start > end {
        return Err(MalformedOutput {
            reason: MalformedReason::NoObject,
            raw: raw.to_string(),
            candidate: None,
        });
    }

    // Both delimiters are ASCII so the byte offsets are char boundaries
    let candidate = &raw[start..=end];

    serde_json::from_str::<ExtractedReport>(candidate).map_err(|e| MalformedOutput {
        reason: MalformedReason::InvalidJson {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        },
        raw: raw.to_string(),
        candidate: Some(candidate.to_string()),
    })
}
