//! Content generation seam — produces CV content for a target job.
//!
//! The orchestrator only sees `ContentGenerator`; `LlmContentGenerator` is the
//! production backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::errors::AppError;
use crate::generation::prompts::CONTENT_GENERATION_PROMPT_TEMPLATE;
use crate::llm_client::prompts::{language_instruction, target_language, JSON_ONLY_INSTRUCTION};
use crate::llm_client::{extract_json_payload, CompletionOptions, CompletionProvider, ModelTier};
use crate::models::resume::{
    ResumeContent, ResumeExperience, ResumeProject, ResumeSkillCategory,
};

const GENERATION_TEMPERATURE: f32 = 0.7;
const GENERATION_MAX_TOKENS: u32 = 2000;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExperience {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default, alias = "startDate")]
    pub start_date: String,
    #[serde(default, alias = "endDate")]
    pub end_date: String,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSkillCategory {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// CV content produced for one generation attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub summary: String,
    pub experience: Vec<GeneratedExperience>,
    pub skills: Vec<GeneratedSkillCategory>,
    pub projects: Vec<GeneratedProject>,
}

impl From<&GeneratedContent> for ResumeContent {
    fn from(content: &GeneratedContent) -> Self {
        ResumeContent {
            summary: Some(content.summary.clone()),
            experience: content
                .experience
                .iter()
                .map(|exp| ResumeExperience {
                    company: Some(exp.company.clone()),
                    position: Some(exp.position.clone()),
                    description: Some(exp.description.clone()),
                    achievements: exp.achievements.clone(),
                })
                .collect(),
            skills: content
                .skills
                .iter()
                .map(|skill| ResumeSkillCategory {
                    category: Some(skill.category.clone()),
                    items: skill.items.clone(),
                    skills_html: None,
                })
                .collect(),
            projects: content
                .projects
                .iter()
                .map(|project| ResumeProject {
                    name: Some(project.name.clone()),
                    description: Some(project.description.clone()),
                    technologies: project.technologies.clone(),
                })
                .collect(),
            ..Default::default()
        }
    }
}

/// Input for one generation attempt.
#[derive(Debug, Clone, Copy)]
pub struct ContentRequest<'a> {
    pub job_description: &'a str,
    pub locale: &'a str,
    /// Job description plus a gap block from the previous attempt. Set on retries only.
    pub enhanced_prompt: Option<&'a str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &ContentRequest<'_>) -> Result<GeneratedContent, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmContentGenerator
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmContentGenerator {
    llm: Arc<dyn CompletionProvider>,
}

impl LlmContentGenerator {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(&self, request: &ContentRequest<'_>) -> Result<GeneratedContent, AppError> {
        let prompt = build_content_prompt(request);
        let options = CompletionOptions {
            tier: ModelTier::Balanced,
            temperature: GENERATION_TEMPERATURE,
            max_tokens: GENERATION_MAX_TOKENS,
        };

        let completion = self.llm.complete(&prompt, options).await?;
        debug!(
            chars = completion.text.len(),
            enhanced = request.enhanced_prompt.is_some(),
            "CV content generated"
        );

        parse_generated_content(&completion.text)
    }
}

fn build_content_prompt(request: &ContentRequest<'_>) -> String {
    let language = target_language(request.locale);
    let job_block = request
        .enhanced_prompt
        .unwrap_or(request.job_description)
        .trim();
    CONTENT_GENERATION_PROMPT_TEMPLATE
        .replace("{language_instruction}", &language_instruction(language))
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{job_block}", job_block)
}

/// Parses model output leniently: missing summary → "", non-array lists → empty,
/// malformed list entries dropped.
fn parse_generated_content(raw: &str) -> Result<GeneratedContent, AppError> {
    let value: Value = serde_json::from_str(extract_json_payload(raw)).map_err(|e| {
        error!("Failed to parse generated CV JSON: {e}");
        AppError::Llm("Failed to parse AI response. Please try again.".to_string())
    })?;

    Ok(GeneratedContent {
        summary: value
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        experience: entries(value.get("experience")),
        skills: entries(value.get("skills")),
        projects: entries(value.get("projects")),
    })
}

fn entries<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}
