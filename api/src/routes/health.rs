//! `GET /api/v1/health` — a minimal liveness probe reporting service name
//! and build version.

use axum::response::IntoResponse;
use axum::Json;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "matchforge-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
