//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use docex_llm::LlmConfig;

use crate::error::DocexError;

/// Main configuration for the docex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocexConfig {
    /// Chunking and concurrency configuration.
    pub pipeline: PipelineConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// LLM backend configuration.
    pub llm: LlmConfig,
}

/// Chunking and concurrency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,

    /// Characters repeated from the end of one chunk at the start of the next.
    pub chunk_overlap: usize,

    /// Documents processed concurrently in a batch.
    pub max_workers: usize,

    /// Chunks of one document sent to the model concurrently.
    pub chunk_concurrency: usize,

    /// Timeout for one structured extraction call, in seconds.
    pub chunk_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 200,
            max_workers: 4,
            chunk_concurrency: 2,
            chunk_timeout_secs: 120,
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// OCR page images when the PDF has no text layer.
    pub ocr_fallback: bool,

    /// Maximum pages to OCR (0 = unlimited).
    pub max_pages: usize,

    /// Inserted between the OCR text of consecutive pages.
    pub page_separator: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            ocr_fallback: true,
            max_pages: 10,
            page_separator: "\n\n".to_string(),
        }
    }
}

/// Available OCR backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    /// The `tesseract` command-line program.
    #[default]
    Tesseract,
    /// PaddleOCR models through `pure-onnx-ocr` (requires the `onnx-ocr` feature).
    Onnx,
}

impl OcrBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tesseract => "tesseract",
            Self::Onnx => "onnx",
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Which engine to use.
    pub backend: OcrBackend,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`.
    pub language: String,

    /// Tesseract executable name or path.
    pub tesseract_binary: String,

    /// Directory with `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub model_dir: PathBuf,

    /// Maximum image dimension (longer side) before OCR.
    pub max_image_size: u32,

    /// Contrast adjustment applied during preprocessing.
    pub contrast: f32,

    /// Unsharp mask sigma (0 disables sharpening).
    pub sharpen_sigma: f32,

    /// Unsharp mask threshold.
    pub sharpen_threshold: i32,

    /// Keep `[UNK]` markers emitted by the ONNX recognizer.
    pub keep_unknown_glyphs: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            language: "eng".to_string(),
            tesseract_binary: "tesseract".to_string(),
            model_dir: PathBuf::from("models"),
            max_image_size: 4096,
            contrast: 30.0,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
            keep_unknown_glyphs: false,
        }
    }
}

impl DocexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), DocexError> {
        let p = &self.pipeline;
        if p.chunk_size == 0 {
            return Err(DocexError::Config("pipeline.chunk_size must be > 0".into()));
        }
        if p.chunk_overlap >= p.chunk_size {
            return Err(DocexError::Config(format!(
                "pipeline.chunk_overlap ({}) must be smaller than pipeline.chunk_size ({})",
                p.chunk_overlap, p.chunk_size
            )));
        }
        if p.max_workers == 0 || p.chunk_concurrency == 0 {
            return Err(DocexError::Config(
                "pipeline.max_workers and pipeline.chunk_concurrency must be > 0".into(),
            ));
        }
        if p.chunk_timeout_secs == 0 {
            return Err(DocexError::Config("pipeline.chunk_timeout_secs must be > 0".into()));
        }
        if self.ocr.max_image_size == 0 {
            return Err(DocexError::Config("ocr.max_image_size must be > 0".into()));
        }
        Ok(())
    }
}
