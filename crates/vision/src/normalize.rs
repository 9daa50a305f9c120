//! Image Normalizer: raw bytes to a portrait, size-bounded RGB image.

use std::io::Cursor;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::debug;

use crate::error::VisionError;
use crate::heic::HeicDecoder;
use crate::pdf::PdfBackend;

/// Width/height ratio above which an image is treated as a receipt lying on its side.
pub const LANDSCAPE_RATIO: f32 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizerConfig {
    /// Longest side after scaling, in pixels.
    pub max_side: u32,
    pub landscape_ratio: f32,
}

impl NormalizerConfig {
    /// Sizing for the local OCR engine.
    pub fn ocr() -> Self {
        Self {
            max_side: 1400,
            landscape_ratio: LANDSCAPE_RATIO,
        }
    }

    /// Sizing for images sent to the vision provider.
    pub fn vision() -> Self {
        Self {
            max_side: 1600,
            landscape_ratio: LANDSCAPE_RATIO,
        }
    }

    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side.max(1);
        self
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self::ocr()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Raster,
    Heic,
    Pdf,
}

/// What the caller knows about the upload.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceHint<'a> {
    pub content_type: Option<&'a str>,
    pub filename: Option<&'a str>,
}

impl<'a> SourceHint<'a> {
    pub fn new(content_type: Option<&'a str>, filename: Option<&'a str>) -> Self {
        Self {
            content_type,
            filename,
        }
    }

    /// Classifies the source from the hint, falling back to the PDF magic bytes.
    pub fn format(&self, bytes: &[u8]) -> SourceFormat {
        let mime = self.content_type.unwrap_or_default().to_ascii_lowercase();
        let name = self.filename.unwrap_or_default().to_ascii_lowercase();
        if mime.contains("heic") || mime.contains("heif") || name.ends_with(".heic") || name.ends_with(".heif") {
            SourceFormat::Heic
        } else if mime == "application/pdf" || name.ends_with(".pdf") || bytes.starts_with(b"%PDF") {
            SourceFormat::Pdf
        } else {
            SourceFormat::Raster
        }
    }
}

/// Decodes uploads and brings them to a canonical orientation and scale.
///
/// PDF and HEIC support are optional backends. Without them those sources
/// fail with [`VisionError::UnsupportedFormat`].
#[derive(Clone, Default)]
pub struct ImageNormalizer {
    config: NormalizerConfig,
    pdf: Option<Arc<dyn PdfBackend>>,
    heic: Option<Arc<dyn HeicDecoder>>,
}

impl ImageNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            pdf: None,
            heic: None,
        }
    }

    pub fn with_pdf(mut self, backend: Arc<dyn PdfBackend>) -> Self {
        self.pdf = Some(backend);
        self
    }

    pub fn with_heic(mut self, decoder: Arc<dyn HeicDecoder>) -> Self {
        self.heic = Some(decoder);
        self
    }

    pub fn config(&self) -> NormalizerConfig {
        self.config
    }

    /// Decodes `bytes`. For PDFs only the first page is carried forward.
    pub fn decode(&self, bytes: &[u8], hint: SourceHint<'_>) -> Result<DynamicImage, VisionError> {
        if bytes.is_empty() {
            return Err(VisionError::EmptyInput);
        }
        match hint.format(bytes) {
            SourceFormat::Raster => image::load_from_memory(bytes)
                .map_err(|e| VisionError::DecodeFailure(e.to_string())),
            SourceFormat::Heic => match &self.heic {
                Some(decoder) => decoder.decode(bytes),
                None => Err(VisionError::UnsupportedFormat("HEIC decoding is not available".into())),
            },
            SourceFormat::Pdf => {
                let backend = self.pdf.as_ref().ok_or_else(|| {
                    VisionError::UnsupportedFormat("PDF rasterization is not available".into())
                })?;
                let png = backend.rasterize_first_page(bytes)?;
                image::load_from_memory_with_format(&png, ImageFormat::Png)
                    .map_err(|e| VisionError::DecodeFailure(e.to_string()))
            }
        }
    }

    /// Decode, rotate to portrait, and bound the longest side.
    pub fn normalize(&self, bytes: &[u8], hint: SourceHint<'_>) -> Result<RgbImage, VisionError> {
        let decoded = self.decode(bytes, hint)?;
        Ok(self.normalize_image(decoded))
    }

    pub fn normalize_image(&self, image: DynamicImage) -> RgbImage {
        let image = ensure_portrait(image, self.config.landscape_ratio);
        let rgb = image.to_rgb8();
        downscale(rgb, self.config.max_side)
    }
}

/// Rotates 90° clockwise when the image is clearly wider than tall.
pub fn ensure_portrait(image: DynamicImage, ratio: f32) -> DynamicImage {
    if image.width() as f32 > image.height() as f32 * ratio {
        debug!(width = image.width(), height = image.height(), "rotating landscape input");
        image.rotate90()
    } else {
        image
    }
}

/// Shrinks so the longest side is at most `max_side`. Never enlarges.
pub fn downscale(image: RgbImage, max_side: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if longest <= max_side {
        return image;
    }
    let scale = max_side as f64 / longest as f64;
    let new_w = ((w as f64 * scale) as u32).max(1);
    let new_h = ((h as f64 * scale) as u32).max(1);
    // `thumbnail` averages source pixels, the area-preserving choice for shrinking.
    imageops::thumbnail(&image, new_w, new_h)
}

/// Resizes by `factor`, used for magnified recognition passes.
pub fn magnify(image: &RgbImage, factor: f32) -> RgbImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return image.clone();
    }
    let w = ((image.width() as f32 * factor).round() as u32).max(1);
    let h = ((image.height() as f32 * factor).round() as u32).max(1);
    imageops::resize(image, w, h, FilterType::CatmullRom)
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>, VisionError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| VisionError::backend("png encoder", e.to_string()))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
        encode_png(&img).unwrap()
    }

    #[test]
    fn landscape_input_is_rotated_to_portrait() {
        let out = ImageNormalizer::default()
            .normalize(&png(300, 200), SourceHint::default())
            .unwrap();
        assert_eq!(out.dimensions(), (200, 300));
    }

    #[test]
    fn near_square_input_is_left_alone() {
        let out = ImageNormalizer::default()
            .normalize(&png(110, 100), SourceHint::default())
            .unwrap();
        assert_eq!(out.dimensions(), (110, 100));
    }

    #[test]
    fn longest_side_is_bounded() {
        let normalizer = ImageNormalizer::new(NormalizerConfig::ocr().with_max_side(100));
        let out = normalizer.normalize(&png(100, 400), SourceHint::default()).unwrap();
        assert_eq!(out.dimensions(), (25, 100));
    }

    #[test]
    fn small_images_are_not_enlarged() {
        assert_eq!(downscale(RgbImage::new(10, 20), 1400).dimensions(), (10, 20));
    }

    #[test]
    fn garbage_is_a_decode_failure() {
        let err = ImageNormalizer::default()
            .normalize(b"definitely not an image", SourceHint::default())
            .unwrap_err();
        assert!(matches!(err, VisionError::DecodeFailure(_)));
    }

    #[test]
    fn heic_without_decoder_is_unsupported() {
        let hint = SourceHint::new(Some("image/heic"), Some("IMG_0001.HEIC"));
        let err = ImageNormalizer::default().normalize(b"ftypheic....", hint).unwrap_err();
        assert!(matches!(err, VisionError::UnsupportedFormat(_)));
    }

    #[test]
    fn pdf_is_detected_by_magic_bytes() {
        let hint = SourceHint::default();
        assert_eq!(hint.format(b"%PDF-1.7\n"), SourceFormat::Pdf);
        let err = ImageNormalizer::default().decode(b"%PDF-1.7\n", hint).unwrap_err();
        assert!(matches!(err, VisionError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_input() {
        let err = ImageNormalizer::default().decode(&[], SourceHint::default()).unwrap_err();
        assert!(matches!(err, VisionError::EmptyInput));
    }
}
