//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmClient, LlmError, ModelResponse, ToolCall, ToolDefinition};
use crate::config::ModelConfig;

/// Backoff between retries of transient failures.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum backoff cap.
    pub max_delay: Duration,
    /// Multiplier per consecutive failure.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Model client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    completions_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    backoff: BackoffConfig,
}

impl OpenAiClient {
    /// Build a client from model settings; `timeout` bounds every request.
    pub fn new(config: &ModelConfig, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            completions_url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            backoff: BackoffConfig::default(),
        })
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    async fn send_once(
        &self,
        body: &RequestBody<'_>,
    ) -> Result<ModelResponse, (LlmError, Option<Duration>)> {
        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| (map_transport_error(e), None))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err((api_error(status, &text), retry_after));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| (LlmError::InvalidResponse(e.to_string()), None))?;

        parse_completion(parsed).map_err(|e| (e, None))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, LlmError> {
        let body = build_request_body(
            &self.model,
            self.temperature,
            system_prompt,
            messages,
            tools,
        );

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(response) => return Ok(response),
                Err((err, retry_after)) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = retry_after
                        .map(|d| d.min(self.backoff.max_delay))
                        .unwrap_or_else(|| self.backoff.delay_for(attempt));
                    tracing::warn!(
                        model = %self.model,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Model request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err((err, _)) => return Err(err),
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn build_request_body<'a>(
    model: &'a str,
    temperature: f32,
    system_prompt: &str,
    messages: &[ChatMessage],
    tools: &'a [ToolDefinition],
) -> RequestBody<'a> {
    let mut all = Vec::with_capacity(messages.len() + 1);
    all.push(ChatMessage::system(system_prompt));
    all.extend_from_slice(messages);

    RequestBody {
        model,
        temperature,
        messages: all,
        tools: if tools.is_empty() { None } else { Some(tools) },
    }
}

fn parse_completion(response: CompletionResponse) -> Result<ModelResponse, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;

    let ResponseMessage {
        content,
        tool_calls,
    } = choice.message;

    match tool_calls {
        Some(calls) if !calls.is_empty() => Ok(ModelResponse::ToolCalls {
            content: content.filter(|c| !c.trim().is_empty()),
            calls,
        }),
        _ => content.map(ModelResponse::Text).ok_or(LlmError::EmptyResponse),
    }
}

fn map_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(err)
    }
}

fn api_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect());

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Parse `Retry-After` header into a Duration (numeric seconds only).
///
/// Values that do not fit a `Duration` (`inf`, `1e30`, negatives) are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get("retry-after")?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|delay| !delay.is_zero())
}
