//! `POST /api/v1/roadmap/generate` (spec §6).

use axum::extract::State;
use axum::Json;
use matchforge_core::error::CoreError;
use matchforge_core::matching;
use matchforge_core::roadmap::{self, Roadmap, DEFAULT_WEEKS};
use serde::{Deserialize, Serialize};

use super::common::resolve_document;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoadmapRequest {
    pub resume_id: String,
    pub jd_id: String,
    #[serde(default)]
    pub target_weeks: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RoadmapResponse {
    pub success: bool,
    pub data: Roadmap,
    pub message: String,
}

pub async fn generate_roadmap(
    State(state): State<AppState>,
    Json(request): Json<RoadmapRequest>,
) -> Result<Json<RoadmapResponse>, AppError> {
    let target_weeks = request.target_weeks.unwrap_or(DEFAULT_WEEKS);
    if !(roadmap::MIN_WEEKS..=roadmap::MAX_WEEKS).contains(&target_weeks) {
        return Err(AppError::Core(CoreError::validation(format!(
            "target_weeks must be between {} and {}, got {target_weeks}",
            roadmap::MIN_WEEKS,
            roadmap::MAX_WEEKS
        ))));
    }

    let resume = resolve_document(&state, &request.resume_id).await?;
    let jd = resolve_document(&state, &request.jd_id).await?;

    let match_result = matching::compute_match(state.store.as_ref(), &resume, &jd).await?;
    let data = roadmap::generate_roadmap(
        state.llm.as_ref(),
        &match_result,
        &resume.cleaned_text,
        &jd.cleaned_text,
        target_weeks,
    )
    .await?;

    Ok(Json(RoadmapResponse {
        success: true,
        data,
        message: "roadmap generated".to_string(),
    }))
}
