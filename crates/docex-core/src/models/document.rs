//! Extraction results at every stage: loader output, per-chunk structured
//! extraction, per-document result and batch aggregate.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// Key-value fields extracted from a document.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Document type used when the model could not classify a document.
pub const FALLBACK_DOCUMENT_TYPE: &str = "other";

/// Document type reported for documents that failed processing.
pub const UNKNOWN_DOCUMENT_TYPE: &str = "unknown";

/// Raw text pulled from one file by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted text.
    pub text: String,

    /// Extraction quality (0.0 - 1.0).
    pub confidence: f32,

    /// Why extraction failed, if it did.
    pub error: Option<String>,
}

/// Clamp a confidence into `[0.0, 1.0]`. NaN and infinities become 0.0.
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl ExtractionResult {
    /// A successful extraction.
    pub fn success(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: clamp_confidence(confidence),
            error: None,
        }
    }

    /// A failed extraction: empty text and zero confidence.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            error: Some(error.into()),
        }
    }

    /// Whether the loader produced text.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Structured fields the model extracted from one chunk of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredExtraction {
    /// Document category, e.g. `driver_license` or `invoice`.
    pub document_type: String,

    /// Key-value fields other than the dedicated dates.
    pub extracted_fields: FieldMap,

    /// When the document stops being valid.
    pub expiry_date: Option<NaiveDate>,

    /// When the document starts being valid.
    pub activation_date: Option<NaiveDate>,

    /// Short description of the document.
    pub summary: String,

    /// Model's self-reported quality (0.0 - 1.0).
    pub confidence: f32,
}

impl Default for StructuredExtraction {
    fn default() -> Self {
        Self {
            document_type: FALLBACK_DOCUMENT_TYPE.to_string(),
            extracted_fields: FieldMap::new(),
            expiry_date: None,
            activation_date: None,
            summary: String::new(),
            confidence: 0.0,
        }
    }
}

/// Declared source format, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Image,
    Word,
    Text,
}

impl SourceType {
    /// Classify a path by extension. Anything unrecognised counts as text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "pdf" => Self::Pdf,
            "png" | "jpg" | "jpeg" | "tiff" | "tif" | "bmp" | "webp" => Self::Image,
            "docx" => Self::Word,
            _ => Self::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Word => "word",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result for one input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// File name of the input.
    pub source: String,
    pub source_type: SourceType,
    pub document_type: String,
    pub extracted_fields: FieldMap,
    pub expiry_date: Option<NaiveDate>,
    pub activation_date: Option<NaiveDate>,
    /// Loader confidence times extraction confidence, rounded to 2 places.
    pub confidence: f32,
    pub summary: String,
    pub error: Option<String>,
}

impl DocumentResult {
    /// A successful result built from a reconciled extraction.
    pub fn extracted(
        source: impl Into<String>,
        source_type: SourceType,
        extraction: StructuredExtraction,
        confidence: f32,
    ) -> Self {
        Self {
            source: source.into(),
            source_type,
            document_type: extraction.document_type,
            extracted_fields: extraction.extracted_fields,
            expiry_date: extraction.expiry_date,
            activation_date: extraction.activation_date,
            confidence: clamp_confidence(confidence),
            summary: extraction.summary,
            error: None,
        }
    }

    /// A failed result carrying safe defaults.
    pub fn failed(
        source: impl Into<String>,
        source_type: SourceType,
        error: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_type,
            document_type: UNKNOWN_DOCUMENT_TYPE.to_string(),
            extracted_fields: FieldMap::new(),
            expiry_date: None,
            activation_date: None,
            confidence: 0.0,
            summary: String::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Results for a list of files, in input order.
///
/// Serialized as `{"documents": [...], "metadata": {"total", "successful", "failed"}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "BatchWire")]
pub struct BatchResult {
    pub documents: Vec<DocumentResult>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchResult {
    /// Build a batch result and count outcomes.
    pub fn from_documents(documents: Vec<DocumentResult>) -> Self {
        let successful = documents.iter().filter(|d| d.is_success()).count();
        let total = documents.len();

        Self {
            documents,
            total,
            successful,
            failed: total - successful,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BatchMetadata {
    total: usize,
    successful: usize,
    failed: usize,
}

#[derive(Deserialize)]
struct BatchWire {
    documents: Vec<DocumentResult>,
    #[allow(dead_code)]
    metadata: Option<BatchMetadata>,
}

impl From<BatchWire> for BatchResult {
    fn from(wire: BatchWire) -> Self {
        // Counts are always recomputed from the documents.
        Self::from_documents(wire.documents)
    }
}

impl Serialize for BatchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            documents: &'a [DocumentResult],
            metadata: BatchMetadata,
        }

        Wire {
            documents: &self.documents,
            metadata: BatchMetadata {
                total: self.total,
                successful: self.successful,
                failed: self.failed,
            },
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_failure_invariant() {
        let result = ExtractionResult::failure("File is empty");
        assert!(!result.is_success());
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(0.42), 0.42);
        assert_eq!(clamp_confidence(-0.5), 0.0);
        assert_eq!(clamp_confidence(7.0), 1.0);
        assert_eq!(clamp_confidence(f32::NAN), 0.0);
        assert_eq!(clamp_confidence(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_extracted_rejects_nan_confidence() {
        let result = DocumentResult::extracted("a.txt", SourceType::Text, StructuredExtraction::default(), f32::NAN);
        assert_eq!(result.confidence, 0.0);
        assert!(serde_json::to_value(&result).unwrap()["confidence"].is_number());
    }

    #[test]
    fn test_source_type_from_path() {
        assert_eq!(SourceType::from_path(Path::new("scan.PDF")), SourceType::Pdf);
        assert_eq!(SourceType::from_path(Path::new("card.jpeg")), SourceType::Image);
        assert_eq!(SourceType::from_path(Path::new("letter.docx")), SourceType::Word);
        assert_eq!(SourceType::from_path(Path::new("notes.txt")), SourceType::Text);
        assert_eq!(SourceType::from_path(Path::new("archive.xyz")), SourceType::Text);
        assert_eq!(SourceType::from_path(Path::new("README")), SourceType::Text);
    }

    #[test]
    fn test_failed_document_defaults() {
        let doc = DocumentResult::failed("a.xyz", SourceType::Text, "unsupported");
        assert_eq!(doc.document_type, "unknown");
        assert!(doc.extracted_fields.is_empty());
        assert_eq!(doc.expiry_date, None);
        assert_eq!(doc.activation_date, None);
        assert_eq!(doc.confidence, 0.0);
        assert_eq!(doc.summary, "");
    }

    #[test]
    fn test_document_dates_serialize_iso() {
        let extraction = StructuredExtraction {
            document_type: "driver_license".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            activation_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            confidence: 0.9,
            ..StructuredExtraction::default()
        };
        let doc = DocumentResult::extracted("license.txt", SourceType::Text, extraction, 0.9);
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["expiry_date"], json!("2025-12-31"));
        assert_eq!(value["activation_date"], json!("2020-01-01"));
        assert_eq!(value["source_type"], json!("text"));
        assert_eq!(value["error"], json!(null));
    }

    #[test]
    fn test_batch_counts_and_shape() {
        let ok = DocumentResult::extracted(
            "a.txt",
            SourceType::Text,
            StructuredExtraction::default(),
            0.5,
        );
        let bad = DocumentResult::failed("b.xyz", SourceType::Text, "unsupported");
        let batch = BatchResult::from_documents(vec![ok.clone(), bad, ok]);

        assert_eq!(batch.total, 3);
        assert_eq!(batch.successful, 2);
        assert_eq!(batch.failed, 1);

        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(
            value["metadata"],
            json!({"total": 3, "successful": 2, "failed": 1})
        );
        assert_eq!(value["documents"].as_array().unwrap().len(), 3);

        let back: BatchResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, batch);
    }
}
