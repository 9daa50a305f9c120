//! `POST /ocr`: receipt OCR with a quick company/total/VAT summary.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use paperflow_extraction::summarize_receipt;

use super::common::{Upload, read_upload, recognize};
use crate::app::dto::{OcrJsonRequest, OcrResponse};
use crate::app::errors::ocr_error;
use crate::app::services::AppServices;

/// Anything shorter cannot be an image.
pub const MIN_UPLOAD_BYTES: usize = 10;

const NO_FILE_MESSAGE: &str =
    "Send an image as multipart/form-data (field 'file') or as 'imageBase64' in a JSON body.";

pub async fn ocr(Extension(services): Extension<Arc<AppServices>>, request: Request) -> Response {
    let upload = match read_request(request).await {
        Ok(upload) => upload,
        Err(response) => return response,
    };
    if upload.bytes.len() < MIN_UPLOAD_BYTES {
        return ocr_error(StatusCode::BAD_REQUEST, "EMPTY_FILE", "The file appears to be empty.");
    }

    let recognition = match recognize(&services, upload).await {
        Ok(recognition) => recognition,
        Err(response) => return response,
    };
    let raw_text = recognition.text.trim().to_string();
    let summary = summarize_receipt(&recognition.lines, &raw_text);
    info!(
        variant = recognition.variant.as_str(),
        total = ?summary.total,
        "ocr completed"
    );

    Json(OcrResponse {
        ok: true,
        company: summary.company,
        total: summary.total,
        vat: summary.vat,
        raw_text,
    })
    .into_response()
}

async fn read_request(request: Request) -> Result<Upload, Response> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ocr_error(StatusCode::BAD_REQUEST, "NO_FILE", e.body_text()))?;
        return match read_upload(&mut multipart).await {
            Ok(Some(upload)) => Ok(upload),
            Ok(None) => Err(ocr_error(StatusCode::BAD_REQUEST, "NO_FILE", NO_FILE_MESSAGE)),
            Err(e) => Err(ocr_error(e.status(), "NO_FILE", e.body_text())),
        };
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| ocr_error(e.status(), "NO_FILE", e.body_text()))?;
    // Unparseable bodies are treated like an empty one.
    let json: OcrJsonRequest = serde_json::from_slice(&body).unwrap_or_default();
    let encoded = json
        .image_base64
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ocr_error(StatusCode::BAD_REQUEST, "NO_FILE", NO_FILE_MESSAGE))?;

    let bytes = decode_data_url(&encoded)
        .map_err(|e| ocr_error(StatusCode::BAD_REQUEST, "BASE64_DECODE_FAILED", e.to_string()))?;
    Ok(Upload {
        bytes,
        ..Upload::default()
    })
}

/// Decodes `data:<mime>;base64,<payload>` or a bare base64 payload.
pub fn decode_data_url(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match value.split_once(',') {
        Some((_, payload)) => payload,
        None => value,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned)
}
