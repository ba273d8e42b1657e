//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{Document, ExtractedInvoice, InvoiceId};
use async_trait::async_trait;

/// Trait for persisting invoice records
///
/// Implemented by the infrastructure layer (invoice-store)
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Error type for store operations
    type Error;

    /// Create the invoices table if it does not exist yet
    async fn ensure_schema(&self) -> Result<(), Self::Error>;

    /// Insert one record and return the id the database assigned
    async fn insert_invoice(&self, invoice: &ExtractedInvoice) -> Result<InvoiceId, Self::Error>;
}

/// Trait for multimodal LLM provider operations
///
/// Implemented by the infrastructure layer (invoice-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error;

    /// Send a document plus an instruction, return the model's text reply
    ///
    /// One request, one response. Implementations must not retry.
    async fn generate(&self, document: &Document, prompt: &str) -> Result<String, Self::Error>;

    /// Model name, for logging
    fn model_name(&self) -> &str;
}
