//! JD Parser — extracts structured requirements from a raw job description.
//!
//! Extraction is never fatal: short input, provider errors and malformed model
//! output all yield `JobRequirements::default()` (four empty lists).

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::generation::prompts::JD_REQUIREMENTS_PROMPT_TEMPLATE;
use crate::llm_client::prompts::{
    language_instruction, normalize_locale, target_language, JSON_ONLY_INSTRUCTION,
};
use crate::llm_client::{extract_json_payload, CompletionOptions, CompletionProvider, ModelTier};

/// Below this trimmed length no extraction is attempted.
pub const MIN_DESCRIPTION_LENGTH: usize = 50;
/// Below this trimmed length a description is too thin to generate from.
pub const INSUFFICIENT_DESCRIPTION_MIN_LENGTH: usize = 100;
/// Fewer extracted items than this marks a description as too thin.
pub const INSUFFICIENT_ITEMS_MIN_COUNT: usize = 3;

const EXTRACTION_TEMPERATURE: f32 = 0.3;
const EXTRACTION_MAX_TOKENS: u32 = 1500;

/// Structured requirements of a job posting.
///
/// Every list holds trimmed, non-empty, case-insensitively unique strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequirements {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    /// Required education, experience, certifications and languages.
    #[serde(default)]
    pub qualifications: Vec<String>,
    /// Preferred or optional items.
    #[serde(default, alias = "niceToHaves")]
    pub nice_to_haves: Vec<String>,
}

impl JobRequirements {
    pub fn total_items(&self) -> usize {
        self.skills.len()
            + self.responsibilities.len()
            + self.qualifications.len()
            + self.nice_to_haves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    /// Builds requirements from untrusted model JSON, checking every field.
    fn from_untrusted(value: &Value) -> Self {
        JobRequirements {
            skills: string_list(value.get("skills")),
            responsibilities: string_list(value.get("responsibilities")),
            qualifications: string_list(value.get("qualifications")),
            nice_to_haves: string_list(
                value
                    .get("niceToHaves")
                    .filter(|v| v.is_array())
                    .or_else(|| value.get("nice_to_haves")),
            ),
        }
    }
}

/// Coerces a JSON value into trimmed, non-empty, deduplicated strings.
/// Anything other than an array yields an empty list; non-string elements are dropped.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Extracts `JobRequirements` from job descriptions through one LLM call.
#[derive(Clone)]
pub struct RequirementsExtractor {
    llm: Arc<dyn CompletionProvider>,
}

impl RequirementsExtractor {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// Extracts requirements in the language of `locale`.
    ///
    /// Returns empty requirements without calling the provider when the
    /// trimmed description is shorter than `MIN_DESCRIPTION_LENGTH`.
    pub async fn extract(&self, job_description: &str, locale: &str) -> JobRequirements {
        let trimmed = job_description.trim();
        let length = trimmed.chars().count();
        if length < MIN_DESCRIPTION_LENGTH {
            warn!(
                "Job description too short for extraction ({} chars, minimum {})",
                length, MIN_DESCRIPTION_LENGTH
            );
            return JobRequirements::default();
        }

        let locale = normalize_locale(locale);
        let prompt = build_requirements_prompt(trimmed, locale);
        let options = CompletionOptions {
            tier: ModelTier::Balanced,
            temperature: EXTRACTION_TEMPERATURE,
            max_tokens: EXTRACTION_MAX_TOKENS,
        };

        let completion = match self.llm.complete(&prompt, options).await {
            Ok(c) => c,
            Err(e) => {
                error!("Error extracting job requirements: {e}");
                return JobRequirements::default();
            }
        };

        match parse_requirements(&completion.text) {
            Some(requirements) => {
                info!(
                    skills = requirements.skills.len(),
                    responsibilities = requirements.responsibilities.len(),
                    qualifications = requirements.qualifications.len(),
                    nice_to_haves = requirements.nice_to_haves.len(),
                    locale,
                    "Job requirements extracted"
                );
                requirements
            }
            None => JobRequirements::default(),
        }
    }
}

fn build_requirements_prompt(job_description: &str, locale: &str) -> String {
    let language = target_language(locale);
    JD_REQUIREMENTS_PROMPT_TEMPLATE
        .replace("{language_instruction}", &language_instruction(language))
        .replace("{language}", language)
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{job_description}", job_description)
}

/// Parses model output into requirements. Returns `None` if the payload is not JSON.
fn parse_requirements(raw: &str) -> Option<JobRequirements> {
    let payload = extract_json_payload(raw);
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(JobRequirements::from_untrusted(&value)),
        Err(e) => {
            error!("Failed to parse job requirements JSON: {e}");
            None
        }
    }
}

/// True when a description is too short or too vague to generate a CV from:
/// under 100 trimmed characters, or fewer than 3 extracted items in total.
pub fn is_job_description_insufficient(
    job_description: &str,
    requirements: &JobRequirements,
) -> bool {
    job_description.trim().chars().count() < INSUFFICIENT_DESCRIPTION_MIN_LENGTH
        || requirements.total_items() < INSUFFICIENT_ITEMS_MIN_COUNT
}
