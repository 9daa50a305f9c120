//! OCR capability and the Tesseract command-line engine.

use std::io::Write;
use std::process::Command;
use std::sync::Arc;

use image::RgbImage;

use crate::error::VisionError;
use crate::normalize::{encode_png, magnify};

/// Recognizes text lines in an image.
///
/// Implementations are constructed once per process and shared read-only.
pub trait OcrEngine: Send + Sync {
    /// Returns recognized lines, top to bottom. `magnification` scales the
    /// image before recognition (1.0 = as given).
    fn recognize(&self, image: &RgbImage, magnification: f32) -> Result<Vec<String>, VisionError>;

    fn name(&self) -> &str;
}

impl<E: OcrEngine + ?Sized> OcrEngine for Arc<E> {
    fn recognize(&self, image: &RgbImage, magnification: f32) -> Result<Vec<String>, VisionError> {
        (**self).recognize(image, magnification)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Runs the `tesseract` binary on a temporary PNG.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    languages: String,
    page_segmentation: u8,
}

impl TesseractEngine {
    /// `languages` uses Tesseract syntax, e.g. `swe+eng`.
    pub fn new(languages: impl Into<String>) -> Self {
        Self {
            languages: languages.into(),
            page_segmentation: 4,
        }
    }

    pub fn with_page_segmentation(mut self, psm: u8) -> Self {
        self.page_segmentation = psm;
        self
    }

    /// Check if tesseract is available on the system.
    pub fn is_available() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &RgbImage, magnification: f32) -> Result<Vec<String>, VisionError> {
        let png = encode_png(&magnify(image, magnification))?;
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .map_err(|e| VisionError::backend("tesseract", e.to_string()))?;
        tmp.write_all(&png)
            .map_err(|e| VisionError::backend("tesseract", e.to_string()))?;

        let output = Command::new("tesseract")
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.page_segmentation.to_string())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VisionError::backend("tesseract", "binary not found (is it installed?)")
                } else {
                    VisionError::backend("tesseract", e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VisionError::backend("tesseract", stderr.trim().to_string()));
        }
        Ok(split_lines(&String::from_utf8_lossy(&output.stdout)))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

fn split_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != "\u{c}")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_and_form_feeds_are_dropped() {
        let lines = split_lines("ICA Nära\n\n  Total 12,00 \n\u{c}\n");
        assert_eq!(lines, vec!["ICA Nära", "Total 12,00"]);
    }
}
