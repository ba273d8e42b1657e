//! Invoice Domain Layer
//!
//! This crate contains the domain model shared by every other crate:
//! the invoice record, the upload allow-list, and the trait seams for the
//! model provider and the store.
//!
//! ## Key Concepts
//!
//! - **Document**: an uploaded file whose media type passed the allow-list
//! - **ExtractedInvoice**: total amount, issue date and issuer tax id as read by the model
//! - **InvoiceRecord**: an extracted invoice plus the id assigned on insert
//!
//! ## Architecture
//!
//! - Only value-type dependencies (`chrono`, `rust_decimal`, `serde`)
//! - Trait definitions for all external interactions
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod invoice;
pub mod media_type;
pub mod traits;

// Re-exports for convenience
pub use invoice::{Document, ExtractedInvoice, InvoiceId, InvoiceRecord};
pub use media_type::MediaType;
