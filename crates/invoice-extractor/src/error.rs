//! Error types for the Extractor

use invoice_llm::LlmError;
use thiserror::Error;

/// Errors that can occur during extraction
///
/// Callers treat every variant as one failure kind; the variants exist so
/// the logs say what went wrong.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Response is not the expected JSON shape
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    /// A required field is absent or null
    #[error("Missing field in LLM response: {0}")]
    MissingField(&'static str),

    /// A field is present but its value is unusable
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}
