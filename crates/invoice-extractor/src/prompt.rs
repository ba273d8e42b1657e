//! LLM prompt engineering for invoice field extraction

use invoice_domain::MediaType;

/// Builds prompts for the LLM to extract invoice fields
pub struct PromptBuilder {
    media_type: MediaType,
}

impl PromptBuilder {
    /// Create a new prompt builder for a document of the given type
    pub fn new(media_type: MediaType) -> Self {
        Self { media_type }
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. What the model is looking at
        prompt.push_str(&format!(
            "Analyze the attached invoice {}.\n\n",
            self.document_noun()
        ));

        // 2. Fields and their formats
        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        // 3. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    fn document_noun(&self) -> &'static str {
        if self.media_type.is_image() {
            "image"
        } else {
            "PDF document"
        }
    }
}

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract exactly these three fields:
1. total_amount: the invoice grand total as a decimal number with a dot separator (e.g. 123.45), no currency symbol, no thousands separator
2. issue_date: the date the invoice was issued, formatted YYYY-MM-DD
3. tax_id: the issuer's tax registration number (for Brazilian invoices, the issuer CNPJ) as printed on the document

Rules:
- Use the issuer (seller) tax id, never the buyer's
- Use the final amount payable, after discounts and taxes
- If a field cannot be found, return null for that field; do not guess"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (a single JSON object only, no additional text):
{
  "total_amount": 123.45,
  "issue_date": "YYYY-MM-DD",
  "tax_id": "string"
}

Remember: Return ONLY valid JSON, no markdown code blocks, no explanations."#;
