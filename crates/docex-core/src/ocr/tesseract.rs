//! Tesseract OCR through its command-line program.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::OcrEngine;
use crate::error::OcrError;
use crate::models::config::OcrConfig;

/// OCR engine that shells out to `tesseract`.
pub struct TesseractEngine {
    binary: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_binary.clone(),
            language: config.language.clone(),
        }
    }

    /// Use a different executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Run Tesseract on an image file.
    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::Recognition(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
                format!("{} not found (install tesseract-ocr)", self.binary),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();

        let file = tempfile::Builder::new()
            .prefix("docex-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        let text = self.run_tesseract(file.path())?;

        debug!(
            "tesseract recognized {} chars in {}ms",
            text.trim().len(),
            start.elapsed().as_millis()
        );
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        let engine = TesseractEngine::default().with_binary("docex-no-such-tesseract");
        let result = engine.recognize(&DynamicImage::new_luma8(8, 8));
        assert!(matches!(result, Err(OcrError::BackendNotAvailable(_))));
    }

    #[test]
    fn test_from_config() {
        let config = OcrConfig {
            language: "deu".to_string(),
            ..OcrConfig::default()
        };
        let engine = TesseractEngine::from_config(&config);
        assert_eq!(engine.language, "deu");
        assert_eq!(engine.binary, "tesseract");
    }
}
