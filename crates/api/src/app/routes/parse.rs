//! `POST /parse`: text plus pattern-extracted fields.
//!
//! PDFs with a usable text layer skip OCR entirely. Scanned PDFs and images
//! go through the OCR pipeline.

use std::sync::Arc;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::{debug, info};

use paperflow_extraction::extract_fields;
use paperflow_vision::SourceFormat;

use super::common::{Upload, blocking, read_upload, recognize};
use crate::app::dto::{ParseMethod, ParseResponse};
use crate::app::errors::{ocr_error, recognition_error_to_response};
use crate::app::services::AppServices;

/// A text layer must be longer than this to be trusted over OCR.
pub const MIN_TEXT_LAYER_CHARS: usize = 50;

pub async fn parse(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => return ocr_error(e.status(), "NO_FILE", e.body_text()),
    };
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return ocr_error(StatusCode::BAD_REQUEST, "NO_FILE", "multipart field 'file' is required"),
        Err(e) => return ocr_error(e.status(), "NO_FILE", e.body_text()),
    };
    if upload.bytes.is_empty() {
        return ocr_error(StatusCode::BAD_REQUEST, "EMPTY_FILE", "The file appears to be empty.");
    }

    let (method, text) = match read_text(&services, upload).await {
        Ok(result) => result,
        Err(response) => return response,
    };
    let fields = extract_fields(&text);
    info!(method = ?method, chars = text.len(), "document parsed");

    Json(ParseResponse {
        ok: true,
        method,
        fields,
        text,
    })
    .into_response()
}

async fn read_text(services: &Arc<AppServices>, upload: Upload) -> Result<(ParseMethod, String), Response> {
    if upload.hint().format(&upload.bytes) == SourceFormat::Pdf {
        if let Some(pdf) = services.pdf().cloned() {
            let bytes = upload.bytes.clone();
            let layer = blocking(move || pdf.text_layer(&bytes))
                .await
                .map_err(recognition_error_to_response)?;
            let layer = layer.trim();
            if layer.chars().count() > MIN_TEXT_LAYER_CHARS {
                return Ok((ParseMethod::Text, layer.to_string()));
            }
            debug!(chars = layer.chars().count(), "text layer too short, falling back to OCR");
        }
    }

    let recognition = recognize(services, upload).await?;
    Ok((ParseMethod::Ocr, recognition.text))
}
