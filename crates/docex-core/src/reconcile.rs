//! Merging per-chunk structured extractions into one document result.
//!
//! Every field is reduced independently:
//! - `extracted_fields`: union of all chunks, the longer value wins a key collision
//! - dates: value from the most confident chunk that reports one
//! - `document_type`: majority vote ignoring the `other` fallback
//! - `summary`: longest, then most confident
//! - `confidence`: mean weighted by how much evidence each chunk found
//!
//! All ties go to the earliest chunk.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::error::{DocexError, Result};
use crate::models::document::{
    FALLBACK_DOCUMENT_TYPE, FieldMap, StructuredExtraction, clamp_confidence,
};

/// Number of extracted fields at which a chunk earns the full field bonus.
const FIELD_BONUS_CAP: usize = 5;

/// Reduce the successful chunk extractions of one document to a single one.
///
/// A single extraction is returned unchanged.
pub fn reconcile(chunks: Vec<StructuredExtraction>) -> Result<StructuredExtraction> {
    if chunks.len() <= 1 {
        return chunks
            .into_iter()
            .next()
            .ok_or(DocexError::ReconciliationInputEmpty);
    }

    let merged = StructuredExtraction {
        document_type: vote_document_type(&chunks),
        extracted_fields: merge_fields(&chunks),
        expiry_date: most_confident_date(&chunks, |c| c.expiry_date),
        activation_date: most_confident_date(&chunks, |c| c.activation_date),
        summary: best_summary(&chunks),
        confidence: weighted_confidence(&chunks),
    };

    debug!(
        "Reconciled {} chunks: type={}, {} fields, expiry={:?}, confidence={:.2}",
        chunks.len(),
        merged.document_type,
        merged.extracted_fields.len(),
        merged.expiry_date,
        merged.confidence
    );

    Ok(merged)
}

fn merge_fields(chunks: &[StructuredExtraction]) -> FieldMap {
    let mut merged = FieldMap::new();

    for chunk in chunks {
        for (key, value) in &chunk.extracted_fields {
            match merged.get(key) {
                Some(existing) if value_len(value) <= value_len(existing) => {}
                _ => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }

    merged
}

/// Textual length of a field value; strings are measured without quotes.
fn value_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Null => 0,
        other => other.to_string().chars().count(),
    }
}

fn most_confident_date<F>(chunks: &[StructuredExtraction], field: F) -> Option<NaiveDate>
where
    F: Fn(&StructuredExtraction) -> Option<NaiveDate>,
{
    let mut best: Option<(f32, NaiveDate)> = None;

    for chunk in chunks {
        let Some(date) = field(chunk) else { continue };
        match best {
            Some((confidence, _)) if chunk.confidence <= confidence => {}
            _ => best = Some((chunk.confidence, date)),
        }
    }

    best.map(|(_, date)| date)
}

fn is_fallback_type(document_type: &str) -> bool {
    let trimmed = document_type.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(FALLBACK_DOCUMENT_TYPE)
}

fn vote_document_type(chunks: &[StructuredExtraction]) -> String {
    // (type, votes) in first-seen order
    let mut tally: Vec<(&str, usize)> = Vec::new();

    for chunk in chunks {
        let document_type = chunk.document_type.trim();
        if is_fallback_type(document_type) {
            continue;
        }
        match tally.iter_mut().find(|(t, _)| *t == document_type) {
            Some((_, votes)) => *votes += 1,
            None => tally.push((document_type, 1)),
        }
    }

    let mut winner: Option<(&str, usize)> = None;
    for &(document_type, votes) in &tally {
        if winner.is_none_or(|(_, best)| votes > best) {
            winner = Some((document_type, votes));
        }
    }

    match winner {
        Some((document_type, _)) => document_type.to_string(),
        None => chunks
            .first()
            .map(|c| c.document_type.clone())
            .unwrap_or_else(|| FALLBACK_DOCUMENT_TYPE.to_string()),
    }
}

fn best_summary(chunks: &[StructuredExtraction]) -> String {
    let mut best: Option<&StructuredExtraction> = None;

    for chunk in chunks.iter().filter(|c| !c.summary.trim().is_empty()) {
        let better = match best {
            None => true,
            Some(current) => {
                let by_len = chunk
                    .summary
                    .chars()
                    .count()
                    .cmp(&current.summary.chars().count());
                let by_conf = chunk
                    .confidence
                    .partial_cmp(&current.confidence)
                    .unwrap_or(Ordering::Equal);
                by_len.then(by_conf) == Ordering::Greater
            }
        };
        if better {
            best = Some(chunk);
        }
    }

    best.map(|c| c.summary.clone()).unwrap_or_default()
}

/// Weight of one chunk's confidence in the document average.
pub fn chunk_weight(chunk: &StructuredExtraction) -> f32 {
    let mut weight = 1.0;
    if chunk.expiry_date.is_some() {
        weight += 0.5;
    }
    if chunk.activation_date.is_some() {
        weight += 0.3;
    }
    let fields = chunk.extracted_fields.len().min(FIELD_BONUS_CAP);
    weight + 0.2 * fields as f32 / FIELD_BONUS_CAP as f32
}

fn weighted_confidence(chunks: &[StructuredExtraction]) -> f32 {
    let (sum, weights) = chunks.iter().fold((0.0f32, 0.0f32), |(sum, weights), chunk| {
        let weight = chunk_weight(chunk);
        (sum + weight * clamp_confidence(chunk.confidence), weights + weight)
    });

    if weights <= 0.0 {
        return 0.0;
    }
    clamp_confidence(sum / weights)
}
