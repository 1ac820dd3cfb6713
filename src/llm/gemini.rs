//! Gemini API client
//!
//! Calls `models/{model}:generateContent` of the Generative Language API.
//! Transient failures (connect errors, timeouts, 429 and 5xx answers) are
//! retried with exponential backoff by `reqwest-retry`.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::LlmClient;
use crate::config::LlmConfig;
use crate::{PlannerError, Result};

const SYSTEM_INSTRUCTION: &str =
    "You are a smart travel agent. Answer every request with valid JSON only, no markdown.";

/// How reqwest's own request timeout displays
const TIMED_OUT_MESSAGE: &str = "operation timed out";

/// Longest error body quoted in error messages
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: ClientWithMiddleware,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    /// Create a new client; fails when no API key is configured
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            PlannerError::config(
                "A Gemini API key is required. Set GOOGLE_API_KEY or llm.api_key.",
            )
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("travelplanner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlannerError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(
                Duration::from_millis(config.retry_min_backoff_ms),
                Duration::from_millis(config.retry_max_backoff_ms),
            )
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json",
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start_time = Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if is_timeout(&e) {
                    warn!(
                        "Gemini request timed out after {:.3}s",
                        start_time.elapsed().as_secs_f64()
                    );
                    PlannerError::timeout(start_time.elapsed())
                } else {
                    error!("Gemini request failed: {}", e);
                    PlannerError::service_unavailable(format!("Gemini request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            error!("Gemini returned {}: {}", status, body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    PlannerError::config(format!("Gemini rejected the API key ({status})"))
                }
                _ => PlannerError::service_unavailable(format!("Gemini returned {status}: {body}")),
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                PlannerError::timeout(start_time.elapsed())
            } else {
                PlannerError::malformed("gemini", format!("Invalid response body: {e}"))
            }
        })?;

        let text = extract_text(parsed)?;

        let total_duration = start_time.elapsed();
        info!(
            "Gemini answered {} chars in {:.3}s",
            text.len(),
            total_duration.as_secs_f64()
        );
        if total_duration.as_secs() > 20 {
            warn!("Slow Gemini response: {:.3}s", total_duration.as_secs_f64());
        }

        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(PlannerError::malformed(
            "gemini",
            format!("prompt was blocked: {reason}"),
        ));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| PlannerError::malformed("gemini", "no candidates in response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        debug!("Empty candidate, finish reason: {:?}", candidate.finish_reason);
        return Err(PlannerError::malformed(
            "gemini",
            format!(
                "empty answer (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    }

    Ok(text)
}

/// Whether the error, possibly wrapped by the retry middleware, is a timeout
fn is_timeout(err: &reqwest_middleware::Error) -> bool {
    match err {
        reqwest_middleware::Error::Reqwest(e) => e.is_timeout() || source_timed_out(e),
        reqwest_middleware::Error::Middleware(e) => e.chain().any(cause_is_timeout),
    }
}

fn source_timed_out(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause_is_timeout(cause) {
            return true;
        }
        source = cause.source();
    }
    false
}

/// The retry middleware hides the `reqwest::Error`; the timeout then only
/// shows up further down the chain
fn cause_is_timeout(cause: &(dyn std::error::Error + 'static)) -> bool {
    if cause
        .downcast_ref::<reqwest::Error>()
        .is_some_and(reqwest::Error::is_timeout)
    {
        return true;
    }
    if cause
        .downcast_ref::<reqwest_middleware::Error>()
        .is_some_and(is_timeout)
    {
        return true;
    }
    if cause
        .downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::TimedOut)
    {
        return true;
    }
    cause.to_string() == TIMED_OUT_MESSAGE
}
