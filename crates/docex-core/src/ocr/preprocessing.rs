//! Image preprocessing for OCR.

use image::{DynamicImage, GenericImageView, GrayImage, imageops};
use tracing::debug;

use crate::models::config::OcrConfig;

/// Prepares scans and photos for text recognition: down-scales very large
/// images, converts to grayscale, flips light-on-dark images to dark-on-light,
/// then boosts contrast and sharpness.
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
    /// Contrast adjustment passed to `imageops::contrast`.
    contrast: f32,
    /// Unsharp mask sigma, 0 disables sharpening.
    sharpen_sigma: f32,
    /// Unsharp mask threshold.
    sharpen_threshold: i32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&OcrConfig::default())
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            max_size: config.max_image_size,
            contrast: config.contrast,
            sharpen_sigma: config.sharpen_sigma,
            sharpen_threshold: config.sharpen_threshold,
        }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Run the full preprocessing chain.
    pub fn preprocess(&self, image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = self.calculate_resize_dimensions(width, height, self.max_size);

        let resized;
        let image = if (new_width, new_height) != (width, height) {
            debug!("Resizing {}x{} -> {}x{} for OCR", width, height, new_width, new_height);
            resized = image.resize_exact(new_width, new_height, imageops::FilterType::Lanczos3);
            &resized
        } else {
            image
        };

        let mut gray = image.to_luma8();

        if is_dark(&gray) {
            debug!("Dark background detected, inverting image");
            imageops::invert(&mut gray);
        }

        let mut gray = imageops::contrast(&gray, self.contrast);
        if self.sharpen_sigma > 0.0 {
            gray = imageops::unsharpen(&gray, self.sharpen_sigma, self.sharpen_threshold);
        }

        DynamicImage::ImageLuma8(gray)
    }

    fn calculate_resize_dimensions(
        &self,
        width: u32,
        height: u32,
        target_size: u32,
    ) -> (u32, u32) {
        let max_dim = width.max(height);

        if max_dim <= target_size {
            return (width, height);
        }

        let scale = target_size as f32 / max_dim as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        (new_width.max(1), new_height.max(1))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean luminance below mid-gray means light text on a dark background.
fn is_dark(image: &GrayImage) -> bool {
    let pixels = image.as_raw();
    if pixels.is_empty() {
        return false;
    }
    let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
    sum / (pixels.len() as u64) < 128
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn test_resize_dimensions() {
        let preprocessor = ImagePreprocessor::new();

        // Image smaller than target
        let (w, h) = preprocessor.calculate_resize_dimensions(500, 300, 960);
        assert_eq!((w, h), (500, 300));

        // Image larger than target
        let (w, h) = preprocessor.calculate_resize_dimensions(1920, 1080, 960);
        assert_eq!(w, 960);
        assert!(h < 960);
    }

    #[test]
    fn test_output_is_grayscale_and_bounded() {
        let preprocessor = ImagePreprocessor::new().with_max_size(100);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 200, Rgb([250, 250, 250])));

        let out = preprocessor.preprocess(&image);
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn test_dark_background_is_inverted() {
        // White text pixel on a black page
        let mut image = RgbImage::from_pixel(40, 40, Rgb([0, 0, 0]));
        image.put_pixel(20, 20, Rgb([255, 255, 255]));

        let preprocessor = ImagePreprocessor::new();
        let out = preprocessor.preprocess(&DynamicImage::ImageRgb8(image)).to_luma8();

        assert!(!is_dark(&out));
        assert_eq!(*out.get_pixel(0, 0), Luma([255]));
    }

    #[test]
    fn test_light_background_kept() {
        let image = GrayImage::from_pixel(10, 10, Luma([230]));
        assert!(!is_dark(&image));
        let image = GrayImage::from_pixel(10, 10, Luma([20]));
        assert!(is_dark(&image));
    }
}
