use paperflow_core::DocumentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("input is empty")]
    EmptyInput,

    #[error("could not decode image: {0}")]
    DecodeFailure(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Every variant/magnification combination failed.
    #[error("recognition failed for all {attempts} attempts")]
    RecognitionExhausted {
        attempts: usize,
        last_error: Option<String>,
    },

    #[error("provider response does not match schema: {0}")]
    ExtractionParseFailed(String),

    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// An external tool (tesseract, poppler, heif-convert) failed.
    #[error("{tool} failed: {message}")]
    Backend { tool: &'static str, message: String },
}

impl VisionError {
    pub(crate) fn backend(tool: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            tool,
            message: message.into(),
        }
    }
}

impl From<DocumentError> for VisionError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::ExtractionParseFailed(msg) => Self::ExtractionParseFailed(msg),
            other => Self::ExtractionParseFailed(other.to_string()),
        }
    }
}
