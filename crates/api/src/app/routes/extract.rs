//! `POST /extract`: structured document extraction through the vision provider.

use std::sync::Arc;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::{info, warn};
use uuid::Uuid;

use paperflow_vision::encode_png;

use super::common::{blocking, read_upload};
use crate::app::dto::ExtractResponse;
use crate::app::errors::{extraction_error_to_response, json_error};
use crate::app::services::AppServices;

pub const ALLOWED_MIME_TYPES: [&str; 6] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/heic",
    "image/heif",
    "application/pdf",
];

pub async fn extract(
    Extension(services): Extension<Arc<AppServices>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let Some(extractor) = services.extractor().cloned() else {
        return json_error(StatusCode::SERVICE_UNAVAILABLE, "extraction_disabled", "no extraction provider configured");
    };
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => return json_error(e.status(), "invalid_upload", e.body_text()),
    };
    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return json_error(StatusCode::BAD_REQUEST, "no_file", "multipart field 'file' is required"),
        Err(e) => return json_error(e.status(), "invalid_upload", e.body_text()),
    };

    if upload.bytes.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "empty_upload", "Empty upload");
    }
    let max = services.config().max_upload_size;
    if upload.bytes.len() > max {
        return json_error(
            StatusCode::PAYLOAD_TOO_LARGE,
            "file_too_large",
            format!("File too large (limit {max} bytes)"),
        );
    }
    let content_type = upload
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    if !ALLOWED_MIME_TYPES.contains(&content_type.to_ascii_lowercase().as_str()) {
        return json_error(
            StatusCode::BAD_REQUEST,
            "unsupported_file_type",
            format!("Unsupported file type {content_type}"),
        );
    }

    let size = upload.bytes.len();
    let filename = secure_filename(upload.filename.as_deref());
    let normalizer = services.vision_normalizer().clone();
    let png = match blocking(move || {
        let image = normalizer.normalize(&upload.bytes, upload.hint())?;
        encode_png(&image)
    })
    .await
    {
        Ok(png) => png,
        Err(err) => {
            warn!(error = %err, "normalization failed");
            return extraction_error_to_response(err);
        }
    };

    let payload = match extractor.extract(&png).await {
        Ok(payload) => payload,
        Err(err) => {
            warn!(model = extractor.model(), error = %err, "provider extraction failed");
            return extraction_error_to_response(err);
        }
    };

    info!(
        filename = %filename,
        content_type = %content_type,
        size,
        document_type = payload.document_type.as_str(),
        "extraction completed"
    );
    Json(ExtractResponse {
        filename,
        content_type,
        payload,
    })
    .into_response()
}

/// Upload name reduced to `[A-Za-z0-9._-]` with a random 8-hex suffix before
/// the extension. Missing names become `upload-<hex>.png`.
pub fn secure_filename(original: Option<&str>) -> String {
    let fallback = format!("upload-{}", random_hex());
    let Some(original) = original.filter(|s| !s.is_empty()) else {
        return format!("{fallback}.png");
    };

    let base_name = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let sanitized: String = base_name
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();

    let (stem, suffix) = match sanitized.rfind('.') {
        Some(dot) if dot > 0 => sanitized.split_at(dot),
        _ => (sanitized.as_str(), ""),
    };
    let stem = if stem.is_empty() { fallback.as_str() } else { stem };
    let suffix = if suffix.len() > 1 { suffix } else { ".png" };
    format!("{stem}-{}{suffix}", random_hex())
}

fn random_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_suffix(name: &str) -> (String, String) {
        let dot = name.rfind('.').unwrap();
        let (stem, ext) = name.split_at(dot);
        let (base, hex) = stem.rsplit_once('-').unwrap();
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        (base.to_string(), ext.to_string())
    }

    #[test]
    fn keeps_safe_characters_and_extension() {
        let name = secure_filename(Some("../../Kvitto ICA (1).JPG"));
        assert_eq!(strip_suffix(&name), ("Kvitto_ICA_1".to_string(), ".JPG".to_string()));
    }

    #[test]
    fn missing_extension_defaults_to_png() {
        let name = secure_filename(Some("scan"));
        assert_eq!(strip_suffix(&name), ("scan".to_string(), ".png".to_string()));
    }

    #[test]
    fn empty_or_unsafe_names_fall_back() {
        let (base, ext) = strip_suffix(&secure_filename(None));
        assert!(base.starts_with("upload"));
        assert_eq!(ext, ".png");

        let (base, ext) = strip_suffix(&secure_filename(Some("åäö")));
        assert!(base.starts_with("upload-"));
        assert_eq!(ext, ".png");
    }
}
