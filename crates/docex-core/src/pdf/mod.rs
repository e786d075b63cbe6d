//! PDF text-layer and embedded image extraction.

mod document;

pub use document::PdfDocument;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;
