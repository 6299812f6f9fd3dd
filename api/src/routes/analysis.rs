//! `POST /api/v1/analysis/match` and `POST /api/v1/analysis/gap-analysis`
//! (spec §6).

use axum::extract::State;
use axum::Json;
use matchforge_core::feedback::{self, Feedback};
use matchforge_core::matching::{self, MatchResult};
use serde::{Deserialize, Serialize};

use super::common::resolve_document;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_document_id: String,
    pub jd_document_id: String,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub success: bool,
    pub data: MatchResult,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GapAnalysisData {
    #[serde(flatten)]
    pub match_result: MatchResult,
    pub feedback: Feedback,
}

#[derive(Debug, Serialize)]
pub struct GapAnalysisResponse {
    pub success: bool,
    pub data: GapAnalysisData,
    pub message: String,
}

pub async fn match_documents(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let resume = resolve_document(&state, &request.resume_document_id).await?;
    let jd = resolve_document(&state, &request.jd_document_id).await?;

    let data = matching::compute_match(state.store.as_ref(), &resume, &jd).await?;
    let message = if data.insufficient_data {
        "insufficient data: one or both documents have no embedded chunks".to_string()
    } else {
        "match computed".to_string()
    };

    Ok(Json(MatchResponse {
        success: true,
        data,
        message,
    }))
}

pub async fn gap_analysis(
    State(state): State<AppState>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<GapAnalysisResponse>, AppError> {
    let resume = resolve_document(&state, &request.resume_document_id).await?;
    let jd = resolve_document(&state, &request.jd_document_id).await?;

    let match_result = matching::compute_match(state.store.as_ref(), &resume, &jd).await?;
    let feedback = feedback::generate_feedback(state.llm.as_ref(), &match_result).await?;

    Ok(Json(GapAnalysisResponse {
        success: true,
        data: GapAnalysisData {
            match_result,
            feedback,
        },
        message: "gap analysis computed".to_string(),
    }))
}
