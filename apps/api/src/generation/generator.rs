//! Iterative CV Generation — retries generation until the content scores well enough.
//!
//! Flow: extract requirements → [generate → score → audit → (below threshold)
//!       build gap prompt → regenerate] × MAX_ITERATIONS → best attempt.
//!
//! Attempts run strictly one after another: each retry needs the previous gaps.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::audit::AuditQueue;
use crate::generation::content::{ContentGenerator, ContentRequest, GeneratedContent};
use crate::generation::jd_parser::{JobRequirements, RequirementsExtractor};
use crate::generation::prompts::GAP_BLOCK_HEADER;
use crate::generation::relevance::{
    calculate_relevance_score, ItemCategory, RelevanceScore, ScoringItem,
};
use crate::llm_client::prompts::DEFAULT_LOCALE;
use crate::models::generation_log::{GapType, GenerationGap, GenerationLogEntry};
use crate::models::resume::ResumeContent;

/// Initial attempt plus two retries.
pub const MAX_ITERATIONS: u32 = 3;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Request for one generation run.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationParams {
    pub job_description: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    /// External job posting id or internal job application id.
    #[serde(default)]
    pub job_id: Option<String>,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

/// Relevance of one attempt plus whether it fell below the quality threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAnalysis {
    #[serde(flatten)]
    pub relevance: RelevanceScore,
    pub is_insufficient: bool,
    pub iteration: u32,
}

#[derive(Debug, Clone)]
struct GenerationAttempt {
    content: GeneratedContent,
    analysis: QualityAnalysis,
    iteration: u32,
}

/// Best attempt of a run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub content: GeneratedContent,
    pub analysis: QualityAnalysis,
    /// Number of attempts that completed (1–3).
    pub iterations_used: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct IterativeGenerator {
    extractor: RequirementsExtractor,
    content: Arc<dyn ContentGenerator>,
    audit: AuditQueue,
    quality_threshold: u32,
}

impl IterativeGenerator {
    pub fn new(
        extractor: RequirementsExtractor,
        content: Arc<dyn ContentGenerator>,
        audit: AuditQueue,
        quality_threshold: u32,
    ) -> Self {
        Self {
            extractor,
            content,
            audit,
            quality_threshold,
        }
    }

    pub fn extractor(&self) -> &RequirementsExtractor {
        &self.extractor
    }

    /// Audit entries the sink failed to store since startup.
    pub fn audit_failures(&self) -> u64 {
        self.audit.failed_count()
    }

    /// Generates CV content for a job, retrying with gap feedback while the
    /// relevance score stays below the quality threshold.
    ///
    /// Fails if nothing can be extracted from the job description, if the very
    /// first attempt fails, or if no attempt completes. A failure after at
    /// least one completed attempt ends the loop and the best attempt is kept.
    pub async fn generate_with_retry(
        &self,
        params: &GenerationParams,
    ) -> Result<GenerationResult, AppError> {
        let requirements = self
            .extractor
            .extract(&params.job_description, &params.locale)
            .await;

        if requirements.is_empty() {
            return Err(AppError::UnprocessableEntity(
                "Unable to extract meaningful requirements from job description. \
                 Please provide a more detailed job description."
                    .to_string(),
            ));
        }

        let mut attempts: Vec<GenerationAttempt> = Vec::new();
        let mut enhanced_prompt: Option<String> = None;

        for iteration in 1..=MAX_ITERATIONS {
            let request = ContentRequest {
                job_description: &params.job_description,
                locale: &params.locale,
                enhanced_prompt: enhanced_prompt.as_deref(),
            };

            let content = match self.content.generate(&request).await {
                Ok(content) => content,
                Err(e) => {
                    error!(
                        resume_id = %params.resume_id,
                        "Generation attempt {iteration} failed: {e}"
                    );
                    if attempts.is_empty() {
                        return Err(e);
                    }
                    break;
                }
            };

            let analysis = self.analyze_quality(&content, &requirements, iteration);
            let score = analysis.relevance.score;

            self.audit.record(GenerationLogEntry {
                user_id: params.user_id,
                resume_id: params.resume_id,
                job_id: params.job_id.clone(),
                score: Some(score),
                gaps: to_generation_gaps(&analysis.relevance.missing_items),
                iteration,
            });

            info!(
                resume_id = %params.resume_id,
                iteration,
                score,
                threshold = self.quality_threshold,
                "Generation attempt scored"
            );

            let done = score >= self.quality_threshold || iteration >= MAX_ITERATIONS;
            if !done {
                enhanced_prompt = Some(build_enhanced_prompt(
                    &params.job_description,
                    &analysis.relevance.missing_items,
                ));
            }
            attempts.push(GenerationAttempt {
                content,
                analysis,
                iteration,
            });
            if done {
                break;
            }
        }

        let iterations_used = attempts.len() as u32;

        // Strictly greater wins, so ties keep the earliest attempt.
        let best = attempts
            .into_iter()
            .reduce(|best, current| {
                if current.analysis.relevance.score > best.analysis.relevance.score {
                    current
                } else {
                    best
                }
            })
            .ok_or_else(|| {
                AppError::Llm("All generation attempts failed. Please try again.".to_string())
            })?;

        if best.analysis.is_insufficient {
            warn!(
                resume_id = %params.resume_id,
                score = best.analysis.relevance.score,
                best_iteration = best.iteration,
                iterations_used,
                "Best attempt is still below the quality threshold"
            );
        }

        Ok(GenerationResult {
            content: best.content,
            analysis: best.analysis,
            iterations_used,
        })
    }

    fn analyze_quality(
        &self,
        content: &GeneratedContent,
        requirements: &JobRequirements,
        iteration: u32,
    ) -> QualityAnalysis {
        let relevance = calculate_relevance_score(&ResumeContent::from(content), requirements);
        QualityAnalysis {
            is_insufficient: relevance.score < self.quality_threshold,
            relevance,
            iteration,
        }
    }
}

/// Appends the previous attempt's gaps to the job description.
/// Sections with no items are left out.
fn build_enhanced_prompt(job_description: &str, missing: &[ScoringItem]) -> String {
    let names = |category: ItemCategory| -> Vec<&str> {
        missing
            .iter()
            .filter(|item| item.category == category)
            .map(|item| item.item.as_str())
            .collect()
    };

    let mut prompt = format!("{job_description}\n\n{GAP_BLOCK_HEADER}\n\n");

    for (category, label) in [
        (ItemCategory::Skill, "Missing Skills (must include)"),
        (ItemCategory::Responsibility, "Missing Responsibilities (must address)"),
        (ItemCategory::Keyword, "Missing Keywords (should incorporate)"),
    ] {
        let items = names(category);
        if !items.is_empty() {
            prompt.push_str(&format!("{label}: {}\n\n", items.join(", ")));
        }
    }

    prompt
}

fn to_generation_gaps(missing: &[ScoringItem]) -> Vec<GenerationGap> {
    missing
        .iter()
        .map(|item| GenerationGap {
            gap_type: match item.category {
                ItemCategory::Skill => GapType::Skill,
                ItemCategory::Responsibility => GapType::Experience,
                ItemCategory::Keyword => GapType::Keyword,
            },
            description: item.item.clone(),
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
