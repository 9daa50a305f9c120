//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: OCR engine, normalizers, and provider handles built once per process
//! - `routes/`: HTTP routes + handlers (one file per endpoint)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Room for multipart boundaries and headers around a maximum-size file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// `/extract` is only mounted when a structured extractor is configured.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let body_limit = services.config().max_upload_size.saturating_add(MULTIPART_OVERHEAD);

    let mut router = Router::new()
        .route("/health", get(routes::system::health))
        .route("/ocr", post(routes::ocr::ocr))
        .route("/parse", post(routes::parse::parse));
    if services.extractor().is_some() {
        router = router.route("/extract", post(routes::extract::extract));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(Extension(services)),
    )
}
