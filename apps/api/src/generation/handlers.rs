//! Axum route handlers for the Generation API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::adapt::{AdaptInput, AdaptationResult};
use crate::generation::audit::list_generation_logs;
use crate::generation::generator::{GenerationParams, GenerationResult};
use crate::generation::jd_parser::{is_job_description_insufficient, JobRequirements};
use crate::generation::relevance::{
    calculate_quick_score, calculate_relevance_score, get_match_strength, MatchStrength,
    RelevanceScore,
};
use crate::llm_client::prompts::DEFAULT_LOCALE;
use crate::models::generation_log::GenerationLogRow;
use crate::models::resume::ResumeContent;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractRequirementsRequest {
    pub job_description: String,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractRequirementsResponse {
    pub requirements: JobRequirements,
    pub insufficient: bool,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRelevanceRequest {
    #[serde(default)]
    pub cv_content: ResumeContent,
    #[serde(default)]
    pub job_requirements: JobRequirements,
    /// Score only, without the item breakdown.
    #[serde(default)]
    pub quick: bool,
}

#[derive(Debug, Serialize)]
pub struct ScoreRelevanceResponse {
    pub score: u32,
    pub match_strength: MatchStrength,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<RelevanceScore>,
}

#[derive(Debug, Deserialize)]
pub struct AdaptResumeRequest {
    #[serde(default)]
    pub cv_content: ResumeContent,
    pub job_description: String,
    pub job_title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationLogsResponse {
    pub logs: Vec<GenerationLogRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/requirements/extract
///
/// Extracts structured requirements from a job description and flags
/// descriptions too thin to tailor against. Never fails: blank or short input
/// yields empty requirements marked insufficient.
pub async fn handle_extract_requirements(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequirementsRequest>,
) -> Json<ExtractRequirementsResponse> {
    let locale = request.locale.as_deref().unwrap_or(DEFAULT_LOCALE);
    let requirements = state
        .generator
        .extractor()
        .extract(&request.job_description, locale)
        .await;
    let insufficient = is_job_description_insufficient(&request.job_description, &requirements);

    Json(ExtractRequirementsResponse {
        requirements,
        insufficient,
    })
}

/// POST /api/v1/relevance/score
///
/// Scores a CV against already-extracted requirements. No LLM involved.
/// With `quick` set only the score and match strength are returned.
pub async fn handle_score_relevance(
    Json(request): Json<ScoreRelevanceRequest>,
) -> Json<ScoreRelevanceResponse> {
    let (score, relevance) = if request.quick {
        let score = calculate_quick_score(&request.cv_content, &request.job_requirements);
        (score, None)
    } else {
        let relevance = calculate_relevance_score(&request.cv_content, &request.job_requirements);
        (relevance.score, Some(relevance))
    };

    Json(ScoreRelevanceResponse {
        score,
        match_strength: get_match_strength(score),
        relevance,
    })
}

/// POST /api/v1/resumes/generate
///
/// Runs the generate → score → retry loop and returns the best attempt.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(params): Json<GenerationParams>,
) -> Result<Json<GenerationResult>, AppError> {
    if params.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let result = state.generator.generate_with_retry(&params).await?;

    info!(
        resume_id = %params.resume_id,
        score = result.analysis.relevance.score,
        iterations_used = result.iterations_used,
        "Tailored CV content generated"
    );

    Ok(Json(result))
}

/// POST /api/v1/resumes/adapt
///
/// Proposes targeted patches that adapt an existing CV to a job.
pub async fn handle_adapt_resume(
    State(state): State<AppState>,
    Json(request): Json<AdaptResumeRequest>,
) -> Result<Json<AdaptationResult>, AppError> {
    let input = AdaptInput {
        cv: &request.cv_content,
        job_description: &request.job_description,
        job_title: &request.job_title,
        company: request.company.as_deref(),
        locale: request.locale.as_deref().unwrap_or(DEFAULT_LOCALE),
    };
    let result = state.adapter.adapt(&input).await?;
    Ok(Json(result))
}

/// GET /api/v1/resumes/:id/generation-logs
pub async fn handle_generation_logs(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<GenerationLogsResponse>, AppError> {
    let logs = list_generation_logs(&state.db, resume_id).await?;
    Ok(Json(GenerationLogsResponse { logs }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_score_relevance_handler() {
        let request: ScoreRelevanceRequest = serde_json::from_value(json!({
            "cv_content": {
                "summary": "Rust engineer",
                "skills": [{"category": "Languages", "items": ["Rust", "Go"]}]
            },
            "job_requirements": {
                "skills": ["Rust", "Go"],
                "responsibilities": [],
                "qualifications": [],
                "niceToHaves": []
            }
        }))
        .unwrap();

        let Json(response) = handle_score_relevance(Json(request)).await;
        let relevance = response.relevance.unwrap();
        assert_eq!(relevance.breakdown.skills_score, 40);
        assert_eq!(relevance.breakdown.responsibilities_score, 40);
        assert_eq!(response.score, 100);
        assert_eq!(response.match_strength, MatchStrength::Strong);
    }

    #[tokio::test]
    async fn test_quick_score_omits_breakdown() {
        let request: ScoreRelevanceRequest = serde_json::from_value(json!({
            "cv_content": {"summary": "Rust engineer"},
            "job_requirements": {"skills": ["Rust", "Kafka"]},
            "quick": true
        }))
        .unwrap();

        let Json(response) = handle_score_relevance(Json(request)).await;
        assert!(response.relevance.is_none());
        // 20 (Rust only) + 40 (no responsibilities) + 10 (one of two keywords)
        assert_eq!(response.score, 70);
        assert_eq!(response.match_strength, MatchStrength::Strong);
    }

    #[tokio::test]
    async fn test_score_relevance_tolerates_missing_fields() {
        let request: ScoreRelevanceRequest = serde_json::from_value(json!({})).unwrap();
        let Json(response) = handle_score_relevance(Json(request)).await;
        assert_eq!(response.score, 100);
        assert!(response.relevance.unwrap().missing_items.is_empty());
    }
}
