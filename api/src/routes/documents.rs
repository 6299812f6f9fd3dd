//! `GET`/`DELETE /api/v1/analysis/documents/{file_id}` (spec §6).
//!
//! Both handlers take the client-facing `file_id`, never `document_id` —
//! the HTTP boundary is where that distinction (spec §9 "Implicit
//! cross-identifier coupling") is enforced structurally, since every
//! [`matchforge_core::store::VectorStore`] method already requires callers
//! to say which kind of id they're passing.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use matchforge_core::store::DocumentLookup;
use matchforge_core::types::{EmbeddingStatus, FileType};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DocumentStatusResponse {
    pub document_id: String,
    pub file_id: String,
    pub filename: String,
    pub file_type: FileType,
    pub embedding_status: EmbeddingStatus,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<DocumentStatusResponse>, AppError> {
    let document = state
        .store
        .get_document(DocumentLookup::ByFileId(matchforge_core::types::FileId(file_id)))
        .await?
        .ok_or(AppError::NotFound)?;

    let chunk_count = state.store.chunk_count(&document.document_id).await?;

    Ok(Json(DocumentStatusResponse {
        document_id: document.document_id.to_string(),
        file_id: document.file_id.to_string(),
        filename: document.filename,
        file_type: document.file_type,
        embedding_status: document.embedding_status,
        chunk_count,
        created_at: document.created_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state
        .store
        .delete_document(&matchforge_core::types::FileId(file_id))
        .await?;
    Ok(Json(DeleteResponse { success: true }))
}
