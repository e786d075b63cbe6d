//! PDF access using lopdf and pdf-extract.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::Result;
use crate::error::PdfError;

/// A loaded PDF.
pub struct PdfDocument {
    document: Document,
    /// Bytes handed to pdf-extract (decrypted when needed).
    raw_data: Vec<u8>,
}

impl PdfDocument {
    /// Parse a PDF from bytes. Documents encrypted with an empty user
    /// password are decrypted.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { document, raw_data })
    }

    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Text layer of the whole document.
    pub fn extract_text(&self) -> Result<String> {
        // pdf-extract panics on some malformed fonts and content streams
        let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&self.raw_data));
        match outcome {
            Ok(result) => result.map_err(|e| PdfError::TextExtraction(e.to_string())),
            Err(_) => Err(PdfError::TextExtraction("text extractor panicked".to_string())),
        }
    }

    /// Images drawn on one page (1-indexed), found through the page's
    /// XObject resources.
    pub fn page_images(&self, page: u32) -> Result<Vec<DynamicImage>> {
        let pages = self.document.get_pages();
        let page_id = pages.get(&page).ok_or(PdfError::InvalidPage(page))?;

        let mut images = Vec::new();
        let Some(resources) = self.page_resources(*page_id) else {
            return Ok(images);
        };

        let xobjects = match resources.get(b"XObject") {
            Ok(xobjects) => self.document.dereference(xobjects).ok(),
            Err(_) => None,
        };
        if let Some((_, Object::Dictionary(xobjects))) = xobjects {
            for (_name, reference) in xobjects.iter() {
                let Ok((_, object)) = self.document.dereference(reference) else {
                    continue;
                };
                if let Some(image) = self.decode_image(object) {
                    images.push(image);
                }
            }
        }

        trace!("Page {}: {} images", page, images.len());
        Ok(images)
    }

    /// Every decodable image object in the document, in object order.
    pub fn all_images(&self) -> Vec<DynamicImage> {
        let images: Vec<DynamicImage> = self
            .document
            .objects
            .values()
            .filter_map(|object| self.decode_image(object))
            .collect();

        debug!("Found {} images in document", images.len());
        images
    }

    fn decode_image(&self, object: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = object else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
        let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;

        let filter = dict.get(b"Filter").ok().and_then(|f| match f {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            _ => None,
        });

        match filter {
            // JPEG data is stored as-is in the stream
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Skipping image with unsupported filter {:?}", filter);
                return None;
            }
            _ => {}
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => self.document.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);
        if bits != 8 {
            trace!("Unsupported bits per component: {}", bits);
            return None;
        }

        raw_to_image(data, width, height, color_space)
    }

    /// Resources dictionary of a page, following `Parent` inheritance.
    fn page_resources(&self, node_id: ObjectId) -> Option<lopdf::Dictionary> {
        let Object::Dictionary(dict) = self.document.get_object(node_id).ok()? else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(resources))) = self.document.dereference(resources) {
                return Some(resources.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.page_resources(*parent_id),
            _ => None,
        }
    }
}

fn raw_to_image(mut data: Vec<u8>, width: u32, height: u32, color_space: &[u8]) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match color_space {
        b"DeviceRGB" | b"RGB" => {
            data.truncate(pixels.checked_mul(3)?);
            RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" => {
            data.truncate(pixels);
            GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        other => {
            trace!("Unsupported color space {:?}", String::from_utf8_lossy(other));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_parse_error() {
        let result = PdfDocument::from_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_raw_gray_image() {
        let image = raw_to_image(vec![0, 64, 128, 255, 9], 2, 2, b"DeviceGray").unwrap();
        assert_eq!(image.to_luma8().into_raw(), vec![0, 64, 128, 255]);
    }

    #[test]
    fn test_raw_image_too_short() {
        assert!(raw_to_image(vec![0; 5], 2, 2, b"DeviceRGB").is_none());
        assert!(raw_to_image(vec![0; 12], 2, 2, b"Indexed").is_none());
    }
}
