use std::sync::Arc;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::Response;
use tracing::warn;

use paperflow_vision::{Recognition, SourceHint, VisionError};

use crate::app::errors::{ocr_error, recognition_error_to_response};
use crate::app::services::AppServices;

/// The multipart field every upload endpoint reads.
pub const FILE_FIELD: &str = "file";

/// One uploaded file, fully buffered.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Upload {
    pub fn hint(&self) -> SourceHint<'_> {
        SourceHint::new(self.content_type.as_deref(), self.filename.as_deref())
    }
}

/// Reads the `file` field; other fields are skipped. `Ok(None)` when absent.
pub async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        return Ok(Some(Upload {
            bytes,
            filename,
            content_type,
        }));
    }
    Ok(None)
}

/// Runs the OCR pipeline off the async runtime, bounded by `OCR_TIMEOUT_SECS`.
pub async fn recognize(services: &Arc<AppServices>, upload: Upload) -> Result<Recognition, Response> {
    let pipeline = services.ocr_pipeline();
    let timeout = services.config().ocr_timeout;
    let task = tokio::task::spawn_blocking(move || pipeline.recognize(&upload.bytes, upload.hint()));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(recognition))) => Ok(recognition),
        Ok(Ok(Err(err))) => {
            warn!(error = %err, "recognition failed");
            Err(recognition_error_to_response(err))
        }
        Ok(Err(join)) => Err(ocr_error(StatusCode::INTERNAL_SERVER_ERROR, "OCR_FAILED", join.to_string())),
        Err(_) => Err(ocr_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "OCR_FAILED",
            format!("recognition did not finish within {}s", timeout.as_secs()),
        )),
    }
}

/// Runs a blocking vision call off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T, VisionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, VisionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VisionError::Backend {
            tool: "worker thread",
            message: e.to_string(),
        })?
}
