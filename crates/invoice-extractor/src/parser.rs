//! Parse LLM output into an extracted invoice

use crate::error::ExtractorError;
use chrono::NaiveDate;
use invoice_domain::ExtractedInvoice;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Longest tax id the invoices table accepts
pub const MAX_TAX_ID_LEN: usize = 32;

/// Decimal places the invoices table keeps for amounts
const AMOUNT_SCALE: u32 = 2;

/// Parse the LLM JSON response into an extracted invoice
///
/// Every field is required. A key that is absent or `null` is an error,
/// never a default, so an incomplete invoice is never persisted.
pub fn parse_llm_response(response: &str) -> Result<ExtractedInvoice, ExtractorError> {
    // LLMs sometimes wrap JSON in markdown code blocks
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(json_str)?;

    let obj = json
        .as_object()
        .ok_or_else(|| ExtractorError::InvalidFormat("Expected JSON object".to_string()))?;

    Ok(ExtractedInvoice {
        total_amount: parse_total_amount(required(obj, "total_amount")?)?,
        issue_date: parse_issue_date(required(obj, "issue_date")?)?,
        tax_id: parse_tax_id(required(obj, "tax_id")?)?,
    })
}

/// Extract the JSON object from a response, handling markdown code blocks
/// and stray text around the object
fn extract_json(response: &str) -> Result<&str, ExtractorError> {
    let trimmed = response.trim();

    // Inside a fence only the fenced text counts; the language tag and any
    // prose after the closing fence fall away with the brace scan below
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => rest.find("```").map_or(rest, |close| &rest[..close]),
        None => trimmed,
    }
    .trim();

    // A bare array is passed through whole so it is reported as the wrong shape
    if body.starts_with('[') {
        return Ok(body);
    }

    let start = body
        .find('{')
        .ok_or_else(|| ExtractorError::InvalidFormat("No JSON object in response".to_string()))?;
    let end = body
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| ExtractorError::InvalidFormat("Unterminated JSON object".to_string()))?;

    Ok(&body[start..=end])
}

fn required<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ExtractorError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ExtractorError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn parse_total_amount(value: &Value) -> Result<Decimal, ExtractorError> {
    let invalid = |reason: String| ExtractorError::InvalidField {
        field: "total_amount",
        reason,
    };

    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(invalid(format!("expected a number, got {}", other))),
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| invalid(format!("'{}' is not a decimal: {}", text, e)))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(invalid(format!("'{}' is negative", text)));
    }

    // Match the NUMERIC(12,2) column so the echoed amount is the stored one
    Ok(amount
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize())
}

fn parse_issue_date(value: &Value) -> Result<NaiveDate, ExtractorError> {
    let text = value.as_str().ok_or_else(|| ExtractorError::InvalidField {
        field: "issue_date",
        reason: format!("expected a YYYY-MM-DD string, got {}", value),
    })?;

    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|e| ExtractorError::InvalidField {
        field: "issue_date",
        reason: format!("'{}' is not a YYYY-MM-DD date: {}", text, e),
    })
}

fn parse_tax_id(value: &Value) -> Result<String, ExtractorError> {
    let invalid = |reason: String| ExtractorError::InvalidField {
        field: "tax_id",
        reason,
    };

    // Some models emit an all-digit id as a bare number
    let tax_id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.is_u64() => n.to_string(),
        other => return Err(invalid(format!("expected a string, got {}", other))),
    };

    if tax_id.is_empty() {
        return Err(invalid("empty".to_string()));
    }
    if tax_id.len() > MAX_TAX_ID_LEN {
        return Err(invalid(format!(
            "{} chars (max: {})",
            tax_id.len(),
            MAX_TAX_ID_LEN
        )));
    }

    Ok(tax_id)
}
