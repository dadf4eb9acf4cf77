/// LLM Client — the single point of entry for all completion calls in Tailor.
///
/// ARCHITECTURAL RULE: No other module may call the completion API directly.
/// Services depend on `CompletionProvider`, never on `LlmClient` itself, so that
/// tests can substitute a scripted provider.
///
/// Models are selected by `ModelTier`, never by raw model id.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

/// Groq exposes an OpenAI-compatible chat completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Symbolic model tiers. Callers pick a tier; the client owns the model ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelTier {
    /// Low latency, for short transformations.
    Fast,
    /// Balanced quality and latency (recommended).
    #[default]
    Balanced,
    /// Best available quality for complex tasks.
    Quality,
}

impl ModelTier {
    pub fn model_id(self) -> &'static str {
        match self {
            ModelTier::Fast => "llama-3.1-8b-instant",
            ModelTier::Balanced => "llama-3.3-70b-versatile",
            ModelTier::Quality => "llama-3.3-70b-versatile",
        }
    }
}

/// Per-call sampling options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub tier: ModelTier,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            tier: ModelTier::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Token accounting as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Text returned by a completion call plus its usage, when reported.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// The completion seam. `LlmClient` is the production implementation.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The single LLM client used by all services in Tailor.
/// Wraps the chat completions API with retry on rate limits and server errors.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            api_url,
        })
    }

    /// Makes a raw chat call, retrying 429 and 5xx with exponential backoff.
    async fn call(&self, prompt: &str, options: CompletionOptions) -> Result<Completion, LlmError> {
        let request_body = ChatRequest {
            model: options.tier.model_id(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let completion = parse_chat_response(&body)?;

            if let Some(usage) = &completion.usage {
                debug!(
                    model = options.tier.model_id(),
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    total_tokens = usage.total_tokens,
                    "LLM call succeeded"
                );
            }

            return Ok(completion);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Reads the first choice of a chat completion body.
/// A missing or blank message is `EmptyContent`.
fn parse_chat_response(body: &str) -> Result<Completion, LlmError> {
    let chat: ChatResponse = serde_json::from_str(body)?;
    let text = chat
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyContent)?;

    Ok(Completion {
        text,
        usage: chat.usage,
    })
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<Completion, LlmError> {
        self.call(prompt, options).await
    }
}

/// Returns the JSON payload of a model response.
///
/// If the trimmed text contains a fenced block (```json ... ``` or ``` ... ```),
/// the first block's inner content is returned; otherwise the whole trimmed text.
pub fn extract_json_payload(text: &str) -> &str {
    let text = text.trim();
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    let body = after_open.strip_prefix("json").unwrap_or(after_open);
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_payload_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json_payload(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_payload_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json_payload(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_payload_no_fences() {
        let input = "  {\"key\": \"value\"}  ";
        assert_eq!(extract_json_payload(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_extract_json_payload_fence_after_preamble() {
        let input = "Here is the result:\n```json\n{\"skills\": []}\n```\nThanks!";
        assert_eq!(extract_json_payload(input), "{\"skills\": []}");
    }

    #[test]
    fn test_extract_json_payload_unclosed_fence_returns_whole_text() {
        let input = "```json\n{\"key\": 1}";
        assert_eq!(extract_json_payload(input), input);
    }

    #[test]
    fn test_model_tiers_map_to_distinct_fast_model() {
        assert_ne!(ModelTier::Fast.model_id(), ModelTier::Balanced.model_id());
        assert_eq!(ModelTier::default(), ModelTier::Balanced);
    }

    #[test]
    fn test_chat_response_tolerates_missing_usage() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_parse_chat_response_reads_first_choice_and_usage() {
        let body = r#"{
            "choices": [{"message": {"content": "first"}}, {"message": {"content": "second"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let completion = parse_chat_response(body).unwrap();
        assert_eq!(completion.text, "first");
        assert_eq!(completion.usage.map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn test_parse_chat_response_without_content_is_empty_content() {
        for body in [
            r#"{"choices": []}"#,
            r#"{"choices": [{"message": {"content": null}}]}"#,
            r#"{"choices": [{"message": {"content": "   "}}]}"#,
        ] {
            assert!(matches!(
                parse_chat_response(body),
                Err(LlmError::EmptyContent)
            ));
        }
    }

    #[test]
    fn test_parse_chat_response_malformed_body_is_parse_error() {
        assert!(matches!(
            parse_chat_response("<html>Bad Gateway</html>"),
            Err(LlmError::Parse(_))
        ));
    }
}
