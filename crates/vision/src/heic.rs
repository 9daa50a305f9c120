//! HEIC/HEIF decoding via libheif's `heif-convert`.

use std::io::Write;
use std::process::Command;

use image::{DynamicImage, ImageFormat};

use crate::error::VisionError;

pub trait HeicDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, VisionError>;
}

#[derive(Debug, Clone, Default)]
pub struct HeifConvertDecoder;

impl HeifConvertDecoder {
    pub fn is_available() -> bool {
        Command::new("heif-convert")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl HeicDecoder for HeifConvertDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, VisionError> {
        let mut input = tempfile::Builder::new()
            .suffix(".heic")
            .tempfile()
            .map_err(|e| VisionError::backend("heif-convert", e.to_string()))?;
        input
            .write_all(bytes)
            .map_err(|e| VisionError::backend("heif-convert", e.to_string()))?;
        let dir = tempfile::tempdir().map_err(|e| VisionError::backend("heif-convert", e.to_string()))?;
        let target = dir.path().join("decoded.png");

        let output = Command::new("heif-convert")
            .arg(input.path())
            .arg(&target)
            .output()
            .map_err(|e| VisionError::UnsupportedFormat(format!("heif-convert unavailable: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VisionError::DecodeFailure(stderr.trim().to_string()));
        }

        let png = std::fs::read(&target).map_err(|e| VisionError::DecodeFailure(e.to_string()))?;
        image::load_from_memory_with_format(&png, ImageFormat::Png)
            .map_err(|e| VisionError::DecodeFailure(e.to_string()))
    }
}
