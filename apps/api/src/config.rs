use anyhow::{bail, Context, Result};

use crate::llm_client::DEFAULT_API_URL;

/// Score at or above which a generated CV is accepted without retrying.
pub const DEFAULT_QUALITY_THRESHOLD: u32 = 70;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub llm_api_key: String,
    pub llm_api_url: String,
    pub quality_threshold: u32,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            llm_api_key: require_env("GROQ_API_KEY")?,
            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            quality_threshold: parse_quality_threshold(
                std::env::var("QUALITY_THRESHOLD").ok().as_deref(),
            )?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Default tracing directive: this crate at `RUST_LOG` level.
    ///
    /// Targets use the crate name (`tailor_api`), not the hyphenated package name.
    pub fn log_directive(&self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self.rust_log)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_quality_threshold(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_QUALITY_THRESHOLD);
    };
    let threshold = raw
        .trim()
        .parse::<u32>()
        .context("QUALITY_THRESHOLD must be an integer")?;
    if threshold > 100 {
        bail!("QUALITY_THRESHOLD must be between 0 and 100, got {threshold}");
    }
    Ok(threshold)
}
