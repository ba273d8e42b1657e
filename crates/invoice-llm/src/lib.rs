//! Invoice LLM Provider Layer
//!
//! Multimodal LLM provider implementations of the `LlmProvider` trait from
//! `invoice-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `GeminiProvider`: Google Gemini `generateContent` API
//!
//! # Examples
//!
//! ```
//! use invoice_domain::{traits::LlmProvider, Document, MediaType};
//! use invoice_llm::MockProvider;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let document = Document::new(MediaType::Png, vec![1, 2, 3]);
//! let result = provider.generate(&document, "test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod gemini;

use async_trait::async_trait;
use invoice_domain::traits::LlmProvider;
use invoice_domain::{Document, MediaType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub use gemini::GeminiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or transport failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// The API answered with a non-success status
    #[error("API error (HTTP {status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the API
        body: String,
    },

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Canned outcome of a mock call
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(String),
}

/// Mock LLM provider for deterministic testing
///
/// This provider returns pre-configured responses without making any network calls.
/// Clones share one call counter, so a test can hand a clone to the code under
/// test and still observe whether the model was reached.
///
/// # Examples
///
/// ```
/// use invoice_domain::MediaType;
/// use invoice_llm::MockProvider;
///
/// let provider = MockProvider::new(r#"{"total_amount": 1}"#)
///     .with_response(MediaType::Pdf, "pdf reply");
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_reply: MockReply,
    replies: HashMap<MediaType, MockReply>,
    call_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all documents
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_reply: MockReply::Text(response.into()),
            replies: HashMap::new(),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a MockProvider whose every call fails with a communication error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            default_reply: MockReply::Error(message.into()),
            replies: HashMap::new(),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Use a specific response for documents of one media type
    pub fn with_response(mut self, media_type: MediaType, response: impl Into<String>) -> Self {
        self.replies
            .insert(media_type, MockReply::Text(response.into()));
        self
    }

    /// Fail for documents of one media type
    pub fn with_error(mut self, media_type: MediaType, message: impl Into<String>) -> Self {
        self.replies
            .insert(media_type, MockReply::Error(message.into()));
        self
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn generate(&self, document: &Document, _prompt: &str) -> Result<String, Self::Error> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match self.replies.get(&document.media_type).unwrap_or(&self.default_reply) {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Error(message) => Err(LlmError::Communication(message.clone())),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
