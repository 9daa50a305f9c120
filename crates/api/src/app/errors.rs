use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use paperflow_vision::VisionError;

/// `{error, message}` body used by `/extract`.
pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// `{ok: false, error, message}` body used by `/ocr` and `/parse`.
pub fn ocr_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "ok": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Recognition failures on the OCR paths.
///
/// Anything that stops the image from being read is the client's problem
/// (415); a readable image that OCR cannot handle is ours (500).
pub fn recognition_error_to_response(err: VisionError) -> axum::response::Response {
    match err {
        VisionError::EmptyInput => ocr_error(StatusCode::BAD_REQUEST, "EMPTY_FILE", err.to_string()),
        VisionError::DecodeFailure(_) | VisionError::UnsupportedFormat(_) | VisionError::Backend { .. } => {
            ocr_error(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "DECODE_FAILED",
                format!("{err}. Send a JPG or PNG image."),
            )
        }
        other => ocr_error(StatusCode::INTERNAL_SERVER_ERROR, "OCR_FAILED", other.to_string()),
    }
}

/// Errors on the `/extract` path.
pub fn extraction_error_to_response(err: VisionError) -> axum::response::Response {
    match err {
        VisionError::EmptyInput => json_error(StatusCode::BAD_REQUEST, "empty_upload", "Empty upload"),
        VisionError::DecodeFailure(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_image", msg),
        VisionError::UnsupportedFormat(msg) => json_error(StatusCode::BAD_REQUEST, "unsupported_file_type", msg),
        VisionError::Backend { tool, message } => json_error(
            StatusCode::BAD_REQUEST,
            "unprocessable_document",
            format!("{tool}: {message}"),
        ),
        VisionError::UpstreamUnavailable(msg) => json_error(StatusCode::BAD_GATEWAY, "upstream_failed", msg),
        VisionError::ExtractionParseFailed(msg) => {
            json_error(StatusCode::BAD_GATEWAY, "invalid_provider_response", msg)
        }
        VisionError::RecognitionExhausted { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
        }
    }
}
