//! Invoice module - the record produced by a successful upload

use crate::media_type::MediaType;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the database when a record is inserted
///
/// Ids are monotonically increasing and never reused; the application never
/// chooses one itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(i64);

impl InvoiceId {
    /// Wrap a raw database id
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: i64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An uploaded document awaiting extraction
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    /// Validated media type
    pub media_type: MediaType,

    /// Raw file contents, untouched
    pub bytes: Vec<u8>,

    /// Original file name, if the client sent one
    pub filename: Option<String>,
}

impl Document {
    /// Create a new document
    pub fn new(media_type: MediaType, bytes: Vec<u8>) -> Self {
        Self {
            media_type,
            bytes,
            filename: None,
        }
    }

    /// Attach the client-supplied file name
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Size of the document in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document has no content
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Bytes are elided so logging a document never dumps the file.
impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .field("filename", &self.filename)
            .finish()
    }
}

/// The three fields read off an invoice by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    /// Invoice grand total
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,

    /// Date the invoice was issued
    pub issue_date: NaiveDate,

    /// Issuer tax registration number (e.g. a 14-digit CNPJ)
    pub tax_id: String,
}

/// A persisted invoice, as returned to the client
///
/// Records are immutable once created; there is no update or delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Database-assigned identifier
    pub id: InvoiceId,

    /// Invoice grand total
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,

    /// Date the invoice was issued
    pub issue_date: NaiveDate,

    /// Issuer tax registration number
    pub tax_id: String,
}

impl InvoiceRecord {
    /// Combine extracted fields with the id the store assigned
    pub fn new(id: InvoiceId, invoice: ExtractedInvoice) -> Self {
        Self {
            id,
            total_amount: invoice.total_amount,
            issue_date: invoice.issue_date,
            tax_id: invoice.tax_id,
        }
    }
}
