//! HTTP error mapping.
//!
//! Translates [`matchforge_core::CoreError`] into the status codes spec §7
//! calls for (`ValidationError`/bad ids → 422, `NotReadyError` → 409,
//! upstream trouble → 502, everything else → 500) without leaking
//! diagnostic detail to the client — that detail is logged, not returned,
//! per spec §7's "diagnostic detail is logged, never returned".

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use matchforge_core::CoreError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// Application-wide error type every handler returns on failure.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Core(CoreError::Validation(msg)) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            // spec §6: matching/gap-analysis/roadmap all return 422 when
            // either document id is unknown or not yet `completed`.
            AppError::Core(CoreError::NotReady { document_id, status }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("document {document_id} is not ready yet (status: {status})"),
            ),
            // Everything else maps on retriability: an upstream/storage
            // hiccup is a 502 the caller might retry, anything else is a
            // 500 (spec §7: diagnostic detail is logged, never returned).
            AppError::Core(err) if err.is_retriable() => {
                tracing::error!(error = %err, "upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "a downstream service is temporarily unavailable".to_string(),
                )
            }
            AppError::Core(err) => {
                tracing::error!(error = %err, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "something went wrong processing this request".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}
