//! Gemini Provider Implementation
//!
//! Provides integration with Google's Gemini `generateContent` REST API.
//! The document travels as base64 inline data next to the text prompt, so
//! images and PDFs go to the model untouched.
//!
//! # Features
//!
//! - Async HTTP communication with the Gemini API
//! - Configurable endpoint, model and timeout
//! - JSON response mode (`responseMimeType: application/json`)
//! - Single attempt per call; callers own any retry policy
//!
//! # Examples
//!
//! ```no_run
//! use invoice_llm::GeminiProvider;
//!
//! let provider = GeminiProvider::new("my-api-key", "gemini-1.5-flash").unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use invoice_domain::traits::LlmProvider;
use invoice_domain::Document;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Gemini API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for a generate call (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API provider for multimodal extraction
pub struct GeminiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

/// Request body for the generateContent API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

/// Response from the generateContent API
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider against the public endpoint
    ///
    /// # Parameters
    ///
    /// - `api_key`: Gemini API key
    /// - `model`: Model to use (e.g., "gemini-1.5-flash")
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_endpoint(
            DEFAULT_ENDPOINT,
            api_key,
            model,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a provider against a specific endpoint with a request timeout
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    /// Generate text for a document and prompt
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The request cannot be sent or times out
    /// - The API answers with a non-success status
    /// - The response has no candidate text
    pub async fn generate_content(
        &self,
        document: &Document,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: document.media_type.as_mime(),
                            data: BASE64.encode(&document.bytes),
                        },
                    },
                    Part::Text { text: prompt },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: 0.0,
            },
        };

        debug!(
            model = %self.model,
            media_type = %document.media_type,
            bytes = document.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        collect_candidate_text(parsed)
    }
}

/// Join the text parts of the first candidate
fn collect_candidate_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(LlmError::InvalidResponse(
            "Candidate contained no text".to_string(),
        ));
    }

    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    type Error = LlmError;

    async fn generate(&self, document: &Document, prompt: &str) -> Result<String, Self::Error> {
        self.generate_content(document, prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
