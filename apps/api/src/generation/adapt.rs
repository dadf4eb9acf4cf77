//! CV Adaptation — proposes targeted patches that fit an existing CV to a job.
//!
//! Unlike the iterative generator this never rewrites the CV: the model returns
//! reviewable patches (summary, one experience description, skill additions)
//! plus its own read of how well the current CV matches.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::errors::AppError;
use crate::generation::prompts::RESUME_ADAPTATION_PROMPT_TEMPLATE;
use crate::generation::relevance::extract_cv_text_content;
use crate::generation::text::strip_html;
use crate::llm_client::prompts::{
    language_instruction, normalize_locale, target_language, JSON_ONLY_INSTRUCTION,
};
use crate::llm_client::{extract_json_payload, CompletionOptions, CompletionProvider, ModelTier};
use crate::models::resume::ResumeContent;

/// Adaptation needs more context than extraction.
pub const MIN_ADAPT_DESCRIPTION_LENGTH: usize = 100;

const ADAPT_TEMPERATURE: f32 = 0.7;
const ADAPT_MAX_TOKENS: u32 = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    #[default]
    Medium,
    Low,
}

/// A proposed replacement for one text field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchField {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub proposed: String,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub reasoning: String,
}

/// Patch for the description of `experience[experience_index]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperiencePatch {
    #[serde(alias = "experienceIndex")]
    pub experience_index: usize,
    #[serde(flatten)]
    pub field: PatchField,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPatch {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEnhancementPatch {
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "itemsToAdd")]
    pub items_to_add: Vec<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub reasoning: String,
}

/// Proposed changes. Absent patches mean "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CvPatches {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PatchField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_description: Option<ExperiencePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills_to_add: Option<Vec<SkillPatch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills_to_enhance: Option<Vec<SkillEnhancementPatch>>,
}

/// The model's assessment of the current CV against the job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdaptationAnalysis {
    /// 0–100.
    pub match_score: u32,
    pub key_gaps: Vec<String>,
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvAdaptationPatch {
    pub job_title: String,
    pub company: String,
    pub job_description: String,
    pub created_at: DateTime<Utc>,
    pub locale: String,
    pub patches: CvPatches,
    pub analysis: AdaptationAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationResult {
    pub patch: CvAdaptationPatch,
    pub tokens_used: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct AdaptInput<'a> {
    pub cv: &'a ResumeContent,
    pub job_description: &'a str,
    pub job_title: &'a str,
    /// Falls back to the job title when absent or blank.
    pub company: Option<&'a str>,
    pub locale: &'a str,
}

// ────────────────────────────────────────────────────────────────────────────
// ResumeAdapter
// ────────────────────────────────────────────────────────────────────────────

pub struct ResumeAdapter {
    llm: Arc<dyn CompletionProvider>,
}

impl ResumeAdapter {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// Proposes patches adapting `input.cv` to the job.
    ///
    /// Rejects descriptions under `MIN_ADAPT_DESCRIPTION_LENGTH` characters, a blank
    /// job title and a CV with no text before any provider call.
    pub async fn adapt(&self, input: &AdaptInput<'_>) -> Result<AdaptationResult, AppError> {
        let job_description = input.job_description.trim();
        if job_description.chars().count() < MIN_ADAPT_DESCRIPTION_LENGTH {
            return Err(AppError::Validation(format!(
                "Job description is too short. Please provide at least \
                 {MIN_ADAPT_DESCRIPTION_LENGTH} characters for accurate CV adaptation."
            )));
        }

        let job_title = input.job_title.trim();
        if job_title.is_empty() {
            return Err(AppError::Validation("job_title cannot be empty".to_string()));
        }

        if extract_cv_text_content(input.cv).is_empty() {
            return Err(AppError::Validation(
                "CV has no content to adapt".to_string(),
            ));
        }

        let company = input
            .company
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(job_title);
        let locale = normalize_locale(input.locale);

        let prompt = build_adaptation_prompt(input.cv, job_description, job_title, company, locale);
        let options = CompletionOptions {
            tier: ModelTier::Balanced,
            temperature: ADAPT_TEMPERATURE,
            max_tokens: ADAPT_MAX_TOKENS,
        };
        let completion = self.llm.complete(&prompt, options).await?;

        let (patches, analysis) = parse_adaptation(&completion.text, input.cv.experience.len())?;
        let tokens_used = completion.usage.map(|u| u.total_tokens).unwrap_or(0);

        info!(
            match_score = analysis.match_score,
            key_gaps = analysis.key_gaps.len(),
            tokens_used,
            "CV adaptation proposed"
        );

        Ok(AdaptationResult {
            patch: CvAdaptationPatch {
                job_title: job_title.to_string(),
                company: company.to_string(),
                job_description: job_description.to_string(),
                created_at: Utc::now(),
                locale: locale.to_string(),
                patches,
                analysis,
            },
            tokens_used,
        })
    }
}

fn build_adaptation_prompt(
    cv: &ResumeContent,
    job_description: &str,
    job_title: &str,
    company: &str,
    locale: &str,
) -> String {
    let language = target_language(locale);

    let summary = cv
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("(none)");

    let experience = cv
        .experience
        .iter()
        .enumerate()
        .map(|(index, exp)| {
            format!(
                "{index}: {} at {} - {}",
                exp.position.as_deref().unwrap_or_default(),
                exp.company.as_deref().unwrap_or_default(),
                strip_html(exp.description.as_deref().unwrap_or_default()).trim()
            )
        })
        .collect::<Vec<_>>();

    let skills = cv
        .skills
        .iter()
        .map(|category| {
            let items = if category.items.is_empty() {
                strip_html(category.skills_html.as_deref().unwrap_or_default())
                    .trim()
                    .to_string()
            } else {
                category.items.join(", ")
            };
            format!(
                "{}: {items}",
                category.category.as_deref().unwrap_or("Skills")
            )
        })
        .collect::<Vec<_>>();

    let or_none = |lines: Vec<String>| {
        if lines.is_empty() {
            "(none)".to_string()
        } else {
            lines.join("\n")
        }
    };

    // Job description goes last so its text is never scanned for placeholders.
    RESUME_ADAPTATION_PROMPT_TEMPLATE
        .replace("{language_instruction}", &language_instruction(language))
        .replace("{job_title}", job_title)
        .replace("{company}", company)
        .replace("{current_summary}", summary)
        .replace("{current_experience}", &or_none(experience))
        .replace("{current_skills}", &or_none(skills))
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{job_description}", job_description)
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

/// Parses model output leniently. Patches with an empty proposal or an
/// experience index outside the CV are dropped; the match score is clamped.
fn parse_adaptation(
    raw: &str,
    experience_count: usize,
) -> Result<(CvPatches, AdaptationAnalysis), AppError> {
    let value: Value = serde_json::from_str(extract_json_payload(raw)).map_err(|e| {
        error!("Failed to parse CV adaptation JSON: {e}");
        AppError::Llm("Failed to parse AI response. Please try again.".to_string())
    })?;

    let patches = value.get("patches");
    let analysis = value.get("analysis");

    let patches = CvPatches {
        summary: pick(patches, "summary", "summary")
            .and_then(object::<PatchField>)
            .filter(|p| !p.proposed.trim().is_empty()),
        experience_description: pick(patches, "experienceDescription", "experience_description")
            .and_then(object::<ExperiencePatch>)
            .filter(|p| p.experience_index < experience_count)
            .filter(|p| !p.field.proposed.trim().is_empty()),
        skills_to_add: pick(patches, "skillsToAdd", "skills_to_add").map(patch_list),
        skills_to_enhance: pick(patches, "skillsToEnhance", "skills_to_enhance").map(patch_list),
    };

    let analysis = AdaptationAnalysis {
        match_score: pick(analysis, "matchScore", "match_score")
            .and_then(Value::as_f64)
            .map(|score| score.clamp(0.0, 100.0).round() as u32)
            .unwrap_or(0),
        key_gaps: strings(pick(analysis, "keyGaps", "key_gaps")),
        strengths: strings(pick(analysis, "strengths", "strengths")),
    };

    Ok((patches, analysis))
}

/// Looks up `camel`, then `snake`, skipping nulls.
fn pick<'a>(object: Option<&'a Value>, camel: &str, snake: &str) -> Option<&'a Value> {
    let object = object?;
    object
        .get(camel)
        .filter(|v| !v.is_null())
        .or_else(|| object.get(snake).filter(|v| !v.is_null()))
}

fn object<T: DeserializeOwned>(value: &Value) -> Option<T> {
    value
        .is_object()
        .then(|| serde_json::from_value(value.clone()).ok())
        .flatten()
}

/// Non-arrays are treated as "no patch"; malformed entries are dropped.
fn patch_list<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    match value {
        Value::Array(items) => items.iter().filter_map(object).collect(),
        _ => Vec::new(),
    }
}

fn strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<ConfidenceLevel, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "high" => ConfidenceLevel::High,
            "low" => ConfidenceLevel::Low,
            _ => ConfidenceLevel::Medium,
        },
        _ => ConfidenceLevel::Medium,
    })
}
