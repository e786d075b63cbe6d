//! Error types for the docex-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the docex library.
#[derive(Error, Debug)]
pub enum DocexError {
    /// No loader accepts the file's extension.
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A loader ran but produced no usable text.
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// The structured extraction call for one chunk failed or timed out.
    #[error("structured extraction failed: {0}")]
    StructuredExtractionFailed(String),

    /// Every chunk of a document failed structured extraction.
    #[error("all {chunks} chunks failed (last error: {last_error})")]
    AllChunksFailed { chunks: usize, last_error: String },

    /// Reconciliation was asked to merge nothing.
    #[error("no chunk extractions to reconcile")]
    ReconciliationInputEmpty,

    /// Work was cancelled before it started.
    #[error("cancelled before processing")]
    Cancelled,

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image decoding error.
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// PDF loading errors.
#[derive(Error, Debug)]
pub enum PdfError {
    /// lopdf could not read the file.
    #[error("malformed PDF: {0}")]
    Parse(String),

    /// The text layer could not be read.
    #[error("text layer unreadable: {0}")]
    TextExtraction(String),

    /// Encrypted with a non-empty password.
    #[error("PDF is password protected")]
    Encrypted,

    #[error("PDF contains no pages")]
    NoPages,

    /// Page number outside the document.
    #[error("page {0} does not exist")]
    InvalidPage(u32),
}

/// OCR engine errors.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The configured OCR backend cannot be used on this machine.
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    /// ONNX models missing or unreadable.
    #[error("cannot load OCR models: {0}")]
    ModelLoad(String),

    /// The engine ran but reported a failure.
    #[error("OCR failed: {0}")]
    Recognition(String),

    /// The image could not be handed to the engine.
    #[error("unusable image: {0}")]
    InvalidImage(String),

    /// I/O error while handing the image to the backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the docex library.
pub type Result<T> = std::result::Result<T, DocexError>;
