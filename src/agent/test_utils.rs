use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{ChatMessage, LlmClient, LlmError, ModelResponse, ToolCall, ToolDefinition};
use crate::tools::{SearchProvider, SearchResult, Tool};

// ===================
// Scripted model
// ===================

/// Model that replays scripted responses and records what it was shown.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<Result<ModelResponse, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn text(text: &str) -> Result<ModelResponse, LlmError> {
        Ok(ModelResponse::Text(text.to_string()))
    }

    /// Tool-call response from `(call_id, tool_name, json_arguments)` triples.
    pub fn tool_calls(calls: Vec<(&str, &str, &str)>) -> Result<ModelResponse, LlmError> {
        Ok(ModelResponse::ToolCalls {
            content: None,
            calls: calls
                .into_iter()
                .map(|(id, name, args)| ToolCall::new(id, name, args))
                .collect(),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// History length passed on each call (system prompt excluded).
    pub fn history_lengths(&self) -> Vec<usize> {
        self.seen.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn last_history(&self) -> Vec<ChatMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        _system_prompt: &str,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ModelResponse, LlmError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelResponse::Text("Done".to_string())))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

// ===================
// Tools
// ===================

/// Search backend with canned results.
pub struct StaticSearch {
    results: Vec<SearchResult>,
}

impl StaticSearch {
    pub fn paris() -> Self {
        let results = ["Paris forecast", "Paris weather live", "Paris news"]
            .iter()
            .enumerate()
            .map(|(i, title)| SearchResult {
                title: title.to_string(),
                url: format!("https://example.com/paris/{}", i + 1),
                snippet: "Sunny, 21°C".to_string(),
            })
            .collect();
        Self { results }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _query: &str, max_results: usize) -> anyhow::Result<Vec<SearchResult>> {
        Ok(self.results.iter().take(max_results).cloned().collect())
    }

    fn provider_name(&self) -> &'static str {
        "static"
    }
}

/// Tool that always fails.
pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("upstream timed out"))
    }
}
