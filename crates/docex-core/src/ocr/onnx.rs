//! PaddleOCR models through `pure-onnx-ocr` (pure Rust, no ONNX Runtime).

use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::OcrEngine;
use crate::error::OcrError;

/// OCR engine backed by `pure-onnx-ocr`.
pub struct OnnxOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    keep_unknown_glyphs: bool,
}

/// One recognized line with the top-left corner of its box.
struct Line {
    x: f32,
    y: f32,
    text: String,
}

impl OnnxOcrEngine {
    /// Create an engine from `det.onnx`, `latin_rec.onnx` and
    /// `latin_dict.txt` in `model_dir`.
    pub fn from_dir(model_dir: &Path, keep_unknown_glyphs: bool) -> Result<Self, OcrError> {
        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(model_dir.join("det.onnx"))
            .rec_model_path(model_dir.join("latin_rec.onnx"))
            .dictionary_path(model_dir.join("latin_dict.txt"))
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            keep_unknown_glyphs,
        })
    }
}

impl OcrEngine for OnnxOcrEngine {
    fn name(&self) -> &str {
        "onnx"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Recognition("OCR engine lock poisoned".to_string()))?;
            engine
                .run_from_image(image)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?
        };

        let mut lines: Vec<Line> = results
            .iter()
            .map(|r| {
                let (x, y) = r
                    .bounding_box
                    .exterior()
                    .coords()
                    .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
                        (x.min(c.x as f32), y.min(c.y as f32))
                    });
                let text = if self.keep_unknown_glyphs {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                Line { x, y, text }
            })
            .collect();

        // Reading order: rows of ~20px top to bottom, then left to right
        lines.sort_by(|a, b| {
            let row_a = (a.y / 20.0) as i32;
            let row_b = (b.y / 20.0) as i32;
            row_a
                .cmp(&row_b)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let text = lines
            .iter()
            .map(|l| l.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            "pure-onnx-ocr: {} lines from {}x{} image in {}ms",
            lines.len(),
            width,
            height,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}
