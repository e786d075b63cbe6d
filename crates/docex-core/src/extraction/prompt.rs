//! Prompt sent to the model for each chunk.

/// Document types the model is asked to choose from.
pub const DOCUMENT_TYPES: &[&str] = &[
    "driver_license",
    "invoice",
    "insurance_card",
    "certificate",
    "contract",
    "passport",
    "membership",
    "license",
    "other",
];

const TEMPLATE: &str = r#"Analyze the following document text and extract information.

Document text:
"""
{text}
"""

Respond with a single JSON object and nothing else, using exactly these keys:

1. "document_type": what kind of document this is. One of: {types}.

2. "extracted_fields": an object with the key information from the document
   (names, numbers, amounts, addresses, identifiers). Do NOT put expiry,
   expiration, issue, activation or validity dates here; they have their own keys.

3. "expiry_date": the expiry/expiration/valid-until date as YYYY-MM-DD.
   If only a month and year are given (e.g. 09/28 or 12/2025), use the LAST
   day of that month (2028-09-30, 2025-12-31). null if there is none.

4. "activation_date": the issue/activation/start/valid-from date as YYYY-MM-DD.
   If only a month and year are given, use the FIRST day of that month.
   null if there is none.

5. "summary": one sentence describing this document.

6. "confidence": how confident you are in this extraction, from 0.0 to 1.0.
   - 1.0: very clear document, all fields found
   - 0.7-0.9: most fields found, some uncertainty
   - 0.4-0.6: partial extraction, unclear document
   - 0.1-0.3: poor quality, guessing
"#;

/// Build the extraction prompt for one chunk of text.
pub fn build_prompt(text: &str) -> String {
    TEMPLATE
        .replace("{types}", &DOCUMENT_TYPES.join(", "))
        .replace("{text}", text.trim())
}
