//! `POST /api/v1/upload` (spec §6).
//!
//! Delegates raw bytes to the configured [`TextExtractor`], then hands the
//! extracted text to [`matchforge_core::IngestionOrchestrator::ingest_in_background`]
//! so the response returns as soon as the document row and its cleaned
//! text exist — embedding continues in the background without blocking the
//! request on the slow part of the pipeline.

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::Json;
use matchforge_core::store::DocumentLookup;
use matchforge_core::types::FileType;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadMetadata {
    pub page_count: Option<u32>,
    pub language: String,
    pub parser_used: String,
    pub extraction_time_ms: u128,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub document_id: String,
    pub filename: String,
    pub cleaned_text: String,
    pub word_count: usize,
    pub char_count: usize,
    pub metadata: UploadMetadata,
}

fn parse_file_type(raw: &str) -> Result<FileType, AppError> {
    match raw {
        "resume" => Ok(FileType::Resume),
        "job_description" => Ok(FileType::JobDescription),
        other => Err(AppError::BadRequest(format!(
            "file_type must be \"resume\" or \"job_description\", got \"{other}\""
        ))),
    }
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut filename = None;
    let mut bytes = None;
    let mut file_type = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                filename = field.file_name().map(str::to_string);
                bytes = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("failed to read file field: {e}")))?,
                );
            }
            Some("file_type") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file_type field: {e}")))?;
                file_type = Some(parse_file_type(&text)?);
            }
            _ => {}
        }
    }

    let filename = filename.ok_or_else(|| AppError::BadRequest("missing file field".to_string()))?;
    let bytes = bytes.ok_or_else(|| AppError::BadRequest("missing file field".to_string()))?;
    let file_type = file_type.ok_or_else(|| AppError::BadRequest("missing file_type field".to_string()))?;

    let started = Instant::now();
    let extracted = state
        .extractor
        .extract(&filename, &bytes)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let extraction_time_ms = started.elapsed().as_millis();

    let document_id = state
        .orchestrator
        .ingest_in_background(filename.clone(), file_type, extracted.text, extracted.page_count)
        .await?;

    let document = state
        .store
        .get_document(DocumentLookup::ByDocumentId(document_id.clone()))
        .await?
        .ok_or_else(|| AppError::BadRequest("document vanished immediately after creation".to_string()))?;

    Ok(Json(UploadResponse {
        file_id: document.file_id.to_string(),
        document_id: document.document_id.to_string(),
        filename: document.filename,
        cleaned_text: document.cleaned_text,
        word_count: document.word_count,
        char_count: document.char_count,
        metadata: UploadMetadata {
            page_count: document.page_count,
            language: document.language,
            parser_used: extracted.parser_used.to_string(),
            extraction_time_ms,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_type_accepts_known_values() {
        assert!(matches!(parse_file_type("resume").unwrap(), FileType::Resume));
        assert!(matches!(
            parse_file_type("job_description").unwrap(),
            FileType::JobDescription
        ));
    }

    #[test]
    fn parse_file_type_rejects_unknown_values() {
        assert!(parse_file_type("cover_letter").is_err());
    }
}
