//! PDF files: text layer first, OCR of page images as fallback.

use std::path::Path;
use std::sync::Arc;

use ::image::DynamicImage;
use tracing::{debug, warn};

use super::{DIRECT_TEXT_CONFIDENCE, Loader, OCR_CONFIDENCE, into_result};
use crate::error::{OcrError, Result};
use crate::models::config::{OcrConfig, PdfConfig};
use crate::models::document::ExtractionResult;
use crate::ocr::{ImagePreprocessor, OcrEngine, recognize_document_image};
use crate::pdf::PdfDocument;

const NO_TEXT: &str = "No text found - may be scanned PDF";

/// Extracts PDF text, OCRing page images when there is no text layer.
pub struct PdfLoader {
    ocr: Arc<dyn OcrEngine>,
    preprocessor: ImagePreprocessor,
    config: PdfConfig,
}

impl PdfLoader {
    pub fn new(ocr: Arc<dyn OcrEngine>, pdf: &PdfConfig, ocr_config: &OcrConfig) -> Self {
        Self {
            ocr,
            preprocessor: ImagePreprocessor::from_config(ocr_config),
            config: pdf.clone(),
        }
    }

    fn load(&self, path: &Path) -> Result<ExtractionResult> {
        let data = std::fs::read(path)?;
        let document = PdfDocument::from_bytes(&data)?;

        let text = document.extract_text().unwrap_or_else(|e| {
            warn!("{}: {}", path.display(), e);
            String::new()
        });
        if !text.trim().is_empty() {
            return Ok(ExtractionResult::success(text, DIRECT_TEXT_CONFIDENCE));
        }

        if !self.config.ocr_fallback {
            return Ok(ExtractionResult::failure(NO_TEXT));
        }

        debug!("{} has no text layer, running OCR", path.display());
        let text = self.ocr_pages(&document)?;
        if text.trim().is_empty() {
            return Ok(ExtractionResult::failure(NO_TEXT));
        }
        Ok(ExtractionResult::success(text, OCR_CONFIDENCE))
    }

    /// Images to OCR, grouped by page. Falls back to every image in the
    /// document (one per page) when no page references an image directly.
    fn page_images(&self, document: &PdfDocument) -> Vec<Vec<DynamicImage>> {
        let limit = match self.config.max_pages {
            0 => usize::MAX,
            n => n,
        };

        let pages: Vec<Vec<DynamicImage>> = (1..=document.page_count())
            .take(limit)
            .map(|page| document.page_images(page).unwrap_or_default())
            .collect();

        if pages.iter().any(|images| !images.is_empty()) {
            return pages;
        }

        document
            .all_images()
            .into_iter()
            .take(limit)
            .map(|image| vec![image])
            .collect()
    }

    fn ocr_pages(&self, document: &PdfDocument) -> Result<String> {
        let mut page_texts = Vec::new();
        let mut last_error: Option<OcrError> = None;

        for (index, images) in self.page_images(document).iter().enumerate() {
            let mut texts = Vec::new();
            for image in images {
                match recognize_document_image(self.ocr.as_ref(), &self.preprocessor, image) {
                    Ok(text) if !text.trim().is_empty() => texts.push(text.trim().to_string()),
                    Ok(_) => {}
                    Err(e) => {
                        warn!("OCR failed on page {}: {}", index + 1, e);
                        last_error = Some(e);
                    }
                }
            }
            if !texts.is_empty() {
                page_texts.push(texts.join("\n"));
            }
        }

        match (page_texts.is_empty(), last_error) {
            (true, Some(e)) => Err(e.into()),
            _ => Ok(page_texts.join(&self.config.page_separator)),
        }
    }
}

impl Loader for PdfLoader {
    fn name(&self) -> &str {
        "pdf"
    }

    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn extract(&self, path: &Path) -> ExtractionResult {
        into_result(self.name(), path, self.load(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::testing::ScriptedEngine;
    use lopdf::{Document, Object, Stream, dictionary};
    use pretty_assertions::assert_eq;

    /// One page showing a 4x4 gray image and no text.
    fn scanned_pdf() -> tempfile::NamedTempFile {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 4,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![200u8; 16],
        ));
        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        });
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"q 100 0 0 100 0 0 cm /Im1 Do Q".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        doc.save(file.path()).unwrap();
        file
    }

    fn loader(engine: Arc<ScriptedEngine>, ocr_fallback: bool) -> PdfLoader {
        let pdf = PdfConfig {
            ocr_fallback,
            ..PdfConfig::default()
        };
        PdfLoader::new(engine, &pdf, &OcrConfig::default())
    }

    #[test]
    fn test_scanned_pdf_uses_ocr() {
        let file = scanned_pdf();
        let engine = Arc::new(ScriptedEngine::new(vec![Ok("POLICY 99-1")]));

        let result = loader(engine.clone(), true).extract(file.path());
        assert_eq!(result, ExtractionResult::success("POLICY 99-1", 0.85));
        assert_eq!(engine.calls(), 1);
    }

    #[test]
    fn test_scanned_pdf_without_ocr_text() {
        let file = scanned_pdf();
        let engine = Arc::new(ScriptedEngine::new(vec![Ok(""), Ok("")]));

        let result = loader(engine, true).extract(file.path());
        assert_eq!(result, ExtractionResult::failure("No text found - may be scanned PDF"));
    }

    #[test]
    fn test_ocr_fallback_disabled() {
        let file = scanned_pdf();
        let engine = Arc::new(ScriptedEngine::new(vec![Ok("unused")]));

        let result = loader(engine.clone(), false).extract(file.path());
        assert!(!result.is_success());
        assert_eq!(engine.calls(), 0);
    }

    #[test]
    fn test_ocr_errors_surface() {
        let file = scanned_pdf();
        let engine = Arc::new(ScriptedEngine::new(vec![Err("engine crashed"), Err("engine crashed")]));

        let result = loader(engine, true).extract(file.path());
        assert!(result.error.unwrap().contains("engine crashed"));
    }

    #[test]
    fn test_invalid_pdf() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        std::fs::write(file.path(), b"%PDF-garbage").unwrap();
        let engine = Arc::new(ScriptedEngine::new(vec![]));

        let result = loader(engine, true).extract(file.path());
        assert!(!result.is_success());
        assert_eq!(result.text, "");
    }
}
