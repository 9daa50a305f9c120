use axum::Json;
use serde_json::{Value, json};

/// Liveness probe. Carries both health shapes clients expect.
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "status": "ok" }))
}
