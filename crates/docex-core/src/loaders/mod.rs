//! Format-specific text loaders and extension-based dispatch.
//!
//! Every loader turns a file into an [`ExtractionResult`]. Loaders never
//! fail: collaborator errors come back as a failed result so one bad file
//! cannot abort a batch.

mod image;
mod pdf;
mod text;
mod word;

pub use self::image::ImageLoader;
pub use self::pdf::PdfLoader;
pub use self::text::TextLoader;
pub use self::word::WordLoader;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{DocexError, Result};
use crate::models::config::DocexConfig;
use crate::models::document::ExtractionResult;
use crate::ocr::OcrEngine;

/// Confidence of text read directly from the file.
pub const DIRECT_TEXT_CONFIDENCE: f32 = 1.0;

/// Confidence of text recognized by OCR.
pub const OCR_CONFIDENCE: f32 = 0.85;

/// A text extraction strategy for a set of file extensions.
pub trait Loader: Send + Sync {
    /// Loader name used in logs and listings.
    fn name(&self) -> &str;

    /// Lowercase extensions (without the dot) this loader handles.
    fn extensions(&self) -> &[&'static str];

    /// Whether this loader handles `path`. Extension match is case-insensitive.
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.extensions()
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Extract the text of `path`.
    fn extract(&self, path: &Path) -> ExtractionResult;
}

/// Convert a loader's internal outcome into an extraction result.
pub(crate) fn into_result(loader: &str, path: &Path, outcome: Result<ExtractionResult>) -> ExtractionResult {
    match outcome {
        Ok(result) => {
            if let Some(error) = &result.error {
                debug!("{}: {} produced no text: {}", loader, path.display(), error);
            }
            result
        }
        Err(e) => {
            tracing::warn!("{}: failed to extract {}: {}", loader, path.display(), e);
            ExtractionResult::failure(e.to_string())
        }
    }
}

/// Ordered list of loaders; the first one that supports a path wins.
#[derive(Clone)]
pub struct LoaderDispatcher {
    loaders: Vec<Arc<dyn Loader>>,
}

impl LoaderDispatcher {
    /// Create a dispatcher. Loaders may not claim the same extension.
    pub fn new(loaders: Vec<Arc<dyn Loader>>) -> Result<Self> {
        let mut owners: HashMap<String, &str> = HashMap::new();
        for loader in &loaders {
            for ext in loader.extensions() {
                if let Some(owner) = owners.insert(ext.to_lowercase(), loader.name()) {
                    return Err(DocexError::Config(format!(
                        "extension .{} claimed by both {} and {}",
                        ext,
                        owner,
                        loader.name()
                    )));
                }
            }
        }
        Ok(Self { loaders })
    }

    /// PDF, image, text and Word loaders in that order.
    pub fn with_defaults(ocr: Arc<dyn OcrEngine>, config: &DocexConfig) -> Self {
        Self {
            loaders: vec![
                Arc::new(PdfLoader::new(ocr.clone(), &config.pdf, &config.ocr)),
                Arc::new(ImageLoader::new(ocr, &config.ocr)),
                Arc::new(TextLoader::new()),
                Arc::new(WordLoader::new()),
            ],
        }
    }

    /// Find the loader for `path`.
    pub fn get_loader(&self, path: &Path) -> Result<Arc<dyn Loader>> {
        self.loaders
            .iter()
            .find(|loader| loader.supports(path))
            .cloned()
            .ok_or_else(|| DocexError::UnsupportedFormat(path.to_path_buf()))
    }

    /// Every supported extension, in dispatch order.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.loaders
            .iter()
            .flat_map(|loader| loader.extensions().iter().copied())
            .collect()
    }

    pub fn loaders(&self) -> &[Arc<dyn Loader>] {
        &self.loaders
    }
}
