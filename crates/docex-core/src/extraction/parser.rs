//! Parsing of raw model completions into structured extractions.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use super::dates::{DateRole, normalize_date};
use crate::error::{DocexError, Result};
use crate::models::document::{FALLBACK_DOCUMENT_TYPE, FieldMap, StructuredExtraction};

/// Parse a model completion.
///
/// Tolerates Markdown code fences and prose around the JSON object. Missing
/// or malformed values fall back to defaults; only a completion without any
/// JSON object is an error.
pub fn parse_response(raw: &str) -> Result<StructuredExtraction> {
    let json = extract_json(raw).ok_or_else(|| {
        DocexError::StructuredExtractionFailed("response contains no JSON object".to_string())
    })?;

    let value: Value = serde_json::from_str(json).map_err(|e| {
        DocexError::StructuredExtractionFailed(format!("invalid JSON in response: {}", e))
    })?;

    let Value::Object(object) = value else {
        return Err(DocexError::StructuredExtractionFailed(
            "response JSON is not an object".to_string(),
        ));
    };

    let document_type = object
        .get("document_type")
        .and_then(Value::as_str)
        .map(normalize_document_type)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_DOCUMENT_TYPE.to_string());

    let mut expiry_date = parse_date(object.get("expiry_date"), DateRole::Expiry);
    let mut activation_date = parse_date(object.get("activation_date"), DateRole::Activation);

    let mut extracted_fields = FieldMap::new();
    if let Some(Value::Object(fields)) = object.get("extracted_fields") {
        for (key, value) in fields {
            match date_role_of_key(key) {
                Some(DateRole::Expiry) => {
                    if expiry_date.is_none() {
                        expiry_date = value.as_str().and_then(|s| normalize_date(s, DateRole::Expiry));
                    }
                    debug!("Dropped date field {:?} from extracted_fields", key);
                }
                Some(DateRole::Activation) => {
                    if activation_date.is_none() {
                        activation_date =
                            value.as_str().and_then(|s| normalize_date(s, DateRole::Activation));
                    }
                    debug!("Dropped date field {:?} from extracted_fields", key);
                }
                None => {
                    extracted_fields.insert(key.clone(), value.clone());
                }
            }
        }
    }

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let confidence = parse_confidence(object.get("confidence"));

    Ok(StructuredExtraction {
        document_type,
        extracted_fields,
        expiry_date,
        activation_date,
        summary,
        confidence,
    })
}

/// Slice out the JSON object from a completion.
fn extract_json(raw: &str) -> Option<&str> {
    let mut text = raw.trim();

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        text = match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        };
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn normalize_document_type(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn parse_date(value: Option<&Value>, role: DateRole) -> Option<NaiveDate> {
    match value {
        Some(Value::String(s)) => {
            let date = normalize_date(s, role);
            if date.is_none() && !s.trim().is_empty() {
                warn!("Could not parse {:?} date {:?}", role, s);
            }
            date
        }
        _ => None,
    }
}

fn parse_confidence(value: Option<&Value>) -> f32 {
    let confidence = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };

    // Some models answer on a 0-100 scale
    let confidence = if confidence > 1.0 && confidence <= 100.0 {
        confidence / 100.0
    } else {
        confidence
    };

    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Classify a field key that carries one of the dedicated dates.
fn date_role_of_key(key: &str) -> Option<DateRole> {
    let key: String = key
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    const EXPIRY: &[&str] = &["expir", "valid_until", "valid_thru", "valid_through", "exp_date", "end_date"];
    const ACTIVATION: &[&str] = &[
        "activation",
        "issue_date",
        "date_of_issue",
        "issued_on",
        "issued_date",
        "valid_from",
        "start_date",
        "effective_date",
    ];

    if EXPIRY.iter().any(|p| key.contains(p)) {
        Some(DateRole::Expiry)
    } else if ACTIVATION.iter().any(|p| key.contains(p)) {
        Some(DateRole::Activation)
    } else {
        None
    }
}
