use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of gap found between a generated CV and the job requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    Skill,
    Keyword,
    Experience,
    Education,
    Certification,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationGap {
    #[serde(rename = "type")]
    pub gap_type: GapType,
    pub description: String,
}

/// One audited generation attempt, as handed to a log sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationLogEntry {
    pub user_id: Uuid,
    pub resume_id: Uuid,
    /// External job posting id or internal job application id.
    pub job_id: Option<String>,
    pub score: Option<u32>,
    pub gaps: Vec<GenerationGap>,
    /// 1-based attempt number within one generation run.
    pub iteration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GenerationLogRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resume_id: Uuid,
    pub job_id: Option<String>,
    pub score: Option<i32>,
    pub gaps: Option<Value>,
    pub iteration: i32,
    pub created_at: DateTime<Utc>,
}
