// Job-tailored CV generation.
// Requirement extraction, relevance scoring, LLM content generation and the
// iterative generate → score → retry loop, with a background audit trail.

pub mod adapt;
pub mod audit;
pub mod content;
pub mod generator;
pub mod handlers;
pub mod jd_parser;
pub mod prompts;
pub mod relevance;
pub mod text;
