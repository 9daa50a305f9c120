//! PDF support via poppler-utils.

use std::io::Write;
use std::process::{Command, Output};

use crate::error::VisionError;

/// Text-layer extraction and first-page rasterization for PDFs.
pub trait PdfBackend: Send + Sync {
    /// Embedded text of the whole document; empty for scanned PDFs.
    fn text_layer(&self, pdf: &[u8]) -> Result<String, VisionError>;

    /// PNG rendering of page one. Later pages are ignored.
    fn rasterize_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>, VisionError>;
}

/// `pdftotext` / `pdftoppm` backend.
#[derive(Debug, Clone)]
pub struct PopplerPdf {
    dpi: u32,
}

impl PopplerPdf {
    pub fn new() -> Self {
        Self { dpi: 200 }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PopplerPdf {
    fn default() -> Self {
        Self::new()
    }
}

fn write_temp(pdf: &[u8], tool: &'static str) -> Result<tempfile::NamedTempFile, VisionError> {
    let mut tmp = tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| VisionError::backend(tool, e.to_string()))?;
    tmp.write_all(pdf)
        .map_err(|e| VisionError::backend(tool, e.to_string()))?;
    Ok(tmp)
}

fn run(tool: &'static str, command: &mut Command) -> Result<Output, VisionError> {
    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            VisionError::backend(tool, "binary not found (install poppler-utils)")
        } else {
            VisionError::backend(tool, e.to_string())
        }
    })?;
    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VisionError::backend(tool, format!("exit {code}: {}", stderr.trim())));
    }
    Ok(output)
}

impl PdfBackend for PopplerPdf {
    fn text_layer(&self, pdf: &[u8]) -> Result<String, VisionError> {
        let tmp = write_temp(pdf, "pdftotext")?;
        let output = run(
            "pdftotext",
            Command::new("pdftotext").arg("-layout").arg(tmp.path()).arg("-"),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).replace('\u{c}', "\n"))
    }

    fn rasterize_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>, VisionError> {
        let tmp = write_temp(pdf, "pdftoppm")?;
        let dir = tempfile::tempdir().map_err(|e| VisionError::backend("pdftoppm", e.to_string()))?;
        let prefix = dir.path().join("page");
        run(
            "pdftoppm",
            Command::new("pdftoppm")
                .args(["-f", "1", "-l", "1", "-png", "-singlefile", "-r"])
                .arg(self.dpi.to_string())
                .arg(tmp.path())
                .arg(&prefix),
        )?;
        let rendered = prefix.with_extension("png");
        std::fs::read(&rendered).map_err(|_| VisionError::DecodeFailure("PDF contained no pages".into()))
    }
}
