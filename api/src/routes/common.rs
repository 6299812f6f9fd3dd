//! Shared lookup helper for the `analysis` and `roadmap` handlers, both of
//! which take `document_id`s and need the same "unknown id is a
//! `ValidationError`" behavior (spec §6: "status 422 if either id
//! unknown").

use matchforge_core::error::CoreError;
use matchforge_core::store::DocumentLookup;
use matchforge_core::types::{Document, DocumentId};

use crate::error::AppError;
use crate::state::AppState;

pub async fn resolve_document(state: &AppState, document_id: &str) -> Result<Document, AppError> {
    state
        .store
        .get_document(DocumentLookup::ByDocumentId(DocumentId(
            document_id.to_string(),
        )))
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::validation(format!(
                "unknown document_id: {document_id}"
            )))
        })
}
