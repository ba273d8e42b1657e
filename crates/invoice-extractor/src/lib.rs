//! Invoice Extractor
//!
//! Reads the three invoice fields off an uploaded document using a
//! multimodal LLM.
//!
//! # Architecture
//!
//! ```text
//! Document → Extractor → LLM → JSON text → Parser → ExtractedInvoice
//! ```
//!
//! # Key Features
//!
//! - **Fixed Prompt**: one instruction asking for a bare JSON object
//! - **Strict Parsing**: `total_amount`, `issue_date` and `tax_id` are all required;
//!   absent or null keys fail the extraction instead of being defaulted
//! - **Single Shot**: one model request per document, no retry
//!
//! # Example Usage
//!
//! ```no_run
//! use invoice_domain::{Document, MediaType};
//! use invoice_extractor::Extractor;
//! use invoice_llm::MockProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = MockProvider::new(
//!     r#"{"total_amount": 123.45, "issue_date": "2024-07-02", "tax_id": "12345678000199"}"#,
//! );
//! let extractor = Extractor::new(llm);
//!
//! let document = Document::new(MediaType::Jpeg, std::fs::read("invoice.jpg")?);
//! let invoice = extractor.extract(&document).await?;
//!
//! println!("Total: {}", invoice.total_amount);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod extractor;
mod parser;
mod prompt;


pub use error::ExtractorError;
pub use extractor::{Extractor, SharedProvider};
pub use parser::{parse_llm_response, MAX_TAX_ID_LEN};
pub use prompt::PromptBuilder;
