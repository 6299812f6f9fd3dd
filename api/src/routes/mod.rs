pub mod analysis;
mod common;
pub mod documents;
pub mod health;
pub mod roadmap;
pub mod upload;

use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

/// Builds the full application router (spec §6). CORS is configured from
/// [`crate::config::Config::cors_origins`] by the caller — this function
/// takes the already-built layer so route wiring and CORS policy stay
/// decoupled from each other.
///
/// Every request gets a generated `request_id`, recorded on the tracing
/// span `TraceLayer` opens around it, so the detailed failure diagnostics
/// logged by `crate::error::AppError` can be correlated with the generic
/// message actually returned to the caller.
pub fn app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/upload", post(upload::upload))
        .route(
            "/api/v1/analysis/documents/:file_id",
            get(documents::get_document).delete(documents::delete_document),
        )
        .route("/api/v1/analysis/match", post(analysis::match_documents))
        .route("/api/v1/analysis/gap-analysis", post(analysis::gap_analysis))
        .route("/api/v1/roadmap/generate", post(roadmap::generate_roadmap))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(cors)
        .with_state(state)
}
