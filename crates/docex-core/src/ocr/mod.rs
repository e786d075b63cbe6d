//! OCR engines and image preprocessing.

#[cfg(feature = "onnx-ocr")]
mod onnx;
mod preprocessing;
mod tesseract;

#[cfg(feature = "onnx-ocr")]
pub use onnx::OnnxOcrEngine;
pub use preprocessing::ImagePreprocessor;
pub use tesseract::TesseractEngine;

use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::{OcrBackend, OcrConfig};

/// Trait for image-to-text engines.
///
/// Engines are shared between concurrently processed documents.
pub trait OcrEngine: Send + Sync {
    /// Engine name used in logs.
    fn name(&self) -> &str;

    /// Recognize the text in an image.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// Build the engine selected in the configuration.
pub fn create_engine(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>, OcrError> {
    match config.backend {
        OcrBackend::Tesseract => Ok(Arc::new(TesseractEngine::from_config(config))),
        #[cfg(feature = "onnx-ocr")]
        OcrBackend::Onnx => Ok(Arc::new(OnnxOcrEngine::from_dir(
            &config.model_dir,
            config.keep_unknown_glyphs,
        )?)),
        #[cfg(not(feature = "onnx-ocr"))]
        OcrBackend::Onnx => Err(OcrError::BackendNotAvailable(
            "built without the onnx-ocr feature".to_string(),
        )),
    }
}

/// OCR a document image: first the preprocessed image, then the raw image
/// if that produced no text.
pub fn recognize_document_image(
    engine: &dyn OcrEngine,
    preprocessor: &ImagePreprocessor,
    image: &DynamicImage,
) -> Result<String, OcrError> {
    let prepared = preprocessor.preprocess(image);
    match engine.recognize(&prepared) {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => debug!("{}: no text after preprocessing, retrying raw image", engine.name()),
        Err(e) => debug!("{}: preprocessed OCR failed ({}), retrying raw image", engine.name(), e),
    }

    engine.recognize(image)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use image::GenericImageView;

    use super::*;

    /// Engine that answers from a script, one entry per call.
    pub struct ScriptedEngine {
        answers: Mutex<Vec<Result<String, String>>>,
        pub seen_sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedEngine {
        pub fn new(answers: Vec<Result<&str, &str>>) -> Self {
            Self {
                answers: Mutex::new(
                    answers
                        .into_iter()
                        .rev()
                        .map(|a| a.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                seen_sizes: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.seen_sizes.lock().unwrap().len()
        }
    }

    impl OcrEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
            self.seen_sizes.lock().unwrap().push(image.dimensions());
            match self.answers.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(OcrError::Recognition(e)),
                None => Ok(String::new()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedEngine;
    use super::*;

    fn blank_image() -> DynamicImage {
        DynamicImage::new_rgb8(20, 10)
    }

    #[test]
    fn test_preprocessed_text_used_first() {
        let engine = ScriptedEngine::new(vec![Ok("HELLO"), Ok("raw")]);
        let text =
            recognize_document_image(&engine, &ImagePreprocessor::new(), &blank_image()).unwrap();
        assert_eq!(text, "HELLO");
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn test_raw_retry_when_preprocessed_empty() {
        let engine = ScriptedEngine::new(vec![Ok("  \n"), Ok("raw text")]);
        let text =
            recognize_document_image(&engine, &ImagePreprocessor::new(), &blank_image()).unwrap();
        assert_eq!(text, "raw text");
        assert_eq!(engine.calls(), 2);
    }

    #[test]
    fn test_raw_retry_after_error() {
        let engine = ScriptedEngine::new(vec![Err("bad input"), Ok("raw text")]);
        let text =
            recognize_document_image(&engine, &ImagePreprocessor::new(), &blank_image()).unwrap();
        assert_eq!(text, "raw text");
    }

    #[cfg(not(feature = "onnx-ocr"))]
    #[test]
    fn test_onnx_requires_feature() {
        let config = OcrConfig {
            backend: OcrBackend::Onnx,
            ..OcrConfig::default()
        };
        assert!(matches!(
            create_engine(&config),
            Err(OcrError::BackendNotAvailable(_))
        ));
    }
}
