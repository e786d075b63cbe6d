//! Scans and photos through OCR.

use std::path::Path;
use std::sync::Arc;

use super::{Loader, OCR_CONFIDENCE, into_result};
use crate::error::Result;
use crate::models::config::OcrConfig;
use crate::models::document::ExtractionResult;
use crate::ocr::{ImagePreprocessor, OcrEngine, recognize_document_image};

const NO_TEXT: &str = "No text found in image";

/// OCRs image files.
pub struct ImageLoader {
    ocr: Arc<dyn OcrEngine>,
    preprocessor: ImagePreprocessor,
}

impl ImageLoader {
    pub fn new(ocr: Arc<dyn OcrEngine>, config: &OcrConfig) -> Self {
        Self {
            ocr,
            preprocessor: ImagePreprocessor::from_config(config),
        }
    }

    fn load(&self, path: &Path) -> Result<ExtractionResult> {
        let image = ::image::open(path)?;
        let text = recognize_document_image(self.ocr.as_ref(), &self.preprocessor, &image)?;

        if text.trim().is_empty() {
            return Ok(ExtractionResult::failure(NO_TEXT));
        }
        Ok(ExtractionResult::success(text, OCR_CONFIDENCE))
    }
}

impl Loader for ImageLoader {
    fn name(&self) -> &str {
        "image"
    }

    fn extensions(&self) -> &[&'static str] {
        &["png", "jpg", "jpeg", "tiff", "tif", "bmp", "webp"]
    }

    fn extract(&self, path: &Path) -> ExtractionResult {
        into_result(self.name(), path, self.load(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::ScriptedEngine;
    use ::image::{DynamicImage, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn png_file() -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([240, 240, 240])))
            .save_with_format(file.path(), ::image::ImageFormat::Png)
            .unwrap();
        file
    }

    #[test]
    fn test_ocr_text() {
        let file = png_file();
        let engine = Arc::new(ScriptedEngine::new(vec![Ok("MEMBER ID 4471")]));
        let loader = ImageLoader::new(engine, &OcrConfig::default());

        let result = loader.extract(file.path());
        assert_eq!(result, ExtractionResult::success("MEMBER ID 4471", 0.85));
    }

    #[test]
    fn test_falls_back_to_raw_image() {
        let file = png_file();
        let engine = Arc::new(ScriptedEngine::new(vec![Ok(""), Ok("RAW")]));
        let loader = ImageLoader::new(engine.clone(), &OcrConfig::default());

        assert_eq!(loader.extract(file.path()).text, "RAW");
        assert_eq!(engine.calls(), 2);
    }

    #[test]
    fn test_no_text() {
        let file = png_file();
        let engine = Arc::new(ScriptedEngine::new(vec![Ok(" "), Ok("")]));
        let loader = ImageLoader::new(engine, &OcrConfig::default());

        assert_eq!(loader.extract(file.path()), ExtractionResult::failure("No text found in image"));
    }

    #[test]
    fn test_corrupt_image() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        std::fs::write(file.path(), b"not a png").unwrap();
        let engine = Arc::new(ScriptedEngine::new(vec![]));
        let loader = ImageLoader::new(engine.clone(), &OcrConfig::default());

        let result = loader.extract(file.path());
        assert!(!result.is_success());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(engine.calls(), 0);
    }
}
