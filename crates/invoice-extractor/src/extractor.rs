//! Core Extractor implementation

use crate::error::ExtractorError;
use crate::parser::parse_llm_response;
use crate::prompt::PromptBuilder;
use invoice_domain::traits::LlmProvider;
use invoice_domain::{Document, ExtractedInvoice};
use invoice_llm::LlmError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared handle to a model provider
pub type SharedProvider = Arc<dyn LlmProvider<Error = LlmError>>;

/// The Extractor turns an uploaded document into invoice fields
///
/// One call to [`Extractor::extract`] makes exactly one model request.
/// Failures are returned as-is; there is no retry.
#[derive(Clone)]
pub struct Extractor {
    llm_provider: SharedProvider,
}

impl Extractor {
    /// Create a new Extractor
    pub fn new<L>(llm_provider: L) -> Self
    where
        L: LlmProvider<Error = LlmError> + 'static,
    {
        Self {
            llm_provider: Arc::new(llm_provider),
        }
    }

    /// Create an Extractor around an already shared provider
    pub fn from_shared(llm_provider: SharedProvider) -> Self {
        Self { llm_provider }
    }

    /// Name of the model behind this extractor
    pub fn model_name(&self) -> &str {
        self.llm_provider.model_name()
    }

    /// Extract total amount, issue date and tax id from a document
    pub async fn extract(&self, document: &Document) -> Result<ExtractedInvoice, ExtractorError> {
        let start_time = Instant::now();

        let prompt = PromptBuilder::new(document.media_type).build();

        info!(
            model = %self.model_name(),
            media_type = %document.media_type,
            bytes = document.len(),
            "Starting extraction"
        );
        debug!("Prompt length: {} chars", prompt.len());

        let llm_response = self.llm_provider.generate(document, &prompt).await?;

        debug!("LLM response length: {} chars", llm_response.len());

        let invoice = parse_llm_response(&llm_response).inspect_err(|e| {
            warn!(error = %e, response = %llm_response, "Unusable LLM response");
        })?;

        info!(
            total_amount = %invoice.total_amount,
            issue_date = %invoice.issue_date,
            tax_id = %invoice.tax_id,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Extraction complete"
        );

        Ok(invoice)
    }
}
