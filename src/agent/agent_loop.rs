//! Core agent loop implementation.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::llm::{ChatMessage, LlmClient, LlmError, ModelResponse, OpenAiClient, ToolCall};
use crate::thread_store::ThreadStore;
use crate::tools::ToolRegistry;

use super::prompt::build_system_prompt;

/// Reply recorded when the model cannot be reached.
pub const MODEL_UNAVAILABLE_REPLY: &str =
    "Sorry, I couldn't reach the language model to answer that. Please try again in a moment.";

/// Reply recorded when a turn runs out of iterations.
pub const LOOP_LIMIT_REPLY: &str =
    "I wasn't able to finish researching this within my step limit. Try narrowing the question or asking again.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] LlmError),

    #[error("Max iterations ({0}) reached without completion")]
    LoopLimitExceeded(usize),
}

impl AgentError {
    /// Assistant reply recorded in the thread for this failure.
    pub fn reply_text(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => MODEL_UNAVAILABLE_REPLY,
            Self::LoopLimitExceeded(_) => LOOP_LIMIT_REPLY,
        }
    }
}

/// Outcome of one completed turn.
#[derive(Debug, Clone, Serialize)]
pub struct AgentTurnResult {
    pub thread_id: String,
    pub final_text: String,
    /// Model invocations made during the turn.
    pub iterations: usize,
    /// Tool calls executed during the turn.
    pub tool_calls: usize,
}

enum LoopState {
    AwaitingModel,
    AwaitingTools(Vec<ToolCall>),
    Done,
}

/// The research agent: model and tools in a loop, with per-thread memory.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    store: Arc<dyn ThreadStore>,
    max_iterations: usize,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        store: Arc<dyn ThreadStore>,
        max_iterations: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            store,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Create an agent with the configured model client and search tool.
    pub fn from_config(config: &Config, store: Arc<dyn ThreadStore>) -> anyhow::Result<Self> {
        let llm = Arc::new(OpenAiClient::new(&config.model, config.request_timeout)?);
        let tools = ToolRegistry::research(&config.search, config.request_timeout)?;

        Ok(Self::new(llm, tools, store, config.max_iterations))
    }

    pub fn store(&self) -> &Arc<dyn ThreadStore> {
        &self.store
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run one turn: append `message` to the thread and loop until the model
    /// answers without tool calls.
    ///
    /// The thread stays locked for the whole turn. On failure an assistant
    /// message with [`AgentError::reply_text`] is appended before returning.
    pub async fn run(
        &self,
        thread_id: &str,
        message: ChatMessage,
    ) -> Result<AgentTurnResult, AgentError> {
        let handle = self.store.get_or_create(thread_id).await;
        let mut thread = handle.lock().await;
        thread.push(message);

        tracing::info!(
            thread_id = %thread_id,
            history = thread.len(),
            model = self.llm.model(),
            "Starting turn"
        );

        let system_prompt = build_system_prompt(chrono::Local::now().date_naive(), &self.tools);
        let tool_schemas = self.tools.get_tool_schemas();

        let mut state = LoopState::AwaitingModel;
        let mut iterations = 0;
        let mut tool_calls = 0;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if iterations >= self.max_iterations {
                        tracing::warn!(
                            thread_id = %thread_id,
                            max_iterations = self.max_iterations,
                            "Turn hit the iteration limit"
                        );
                        let err = AgentError::LoopLimitExceeded(self.max_iterations);
                        thread.push(ChatMessage::assistant(err.reply_text()));
                        return Err(err);
                    }
                    iterations += 1;
                    tracing::debug!("Agent iteration {}", iterations);

                    let response = self
                        .llm
                        .complete(&system_prompt, thread.messages(), &tool_schemas)
                        .await;

                    match response {
                        Ok(ModelResponse::Text(text)) => {
                            thread.push(ChatMessage::assistant(text));
                            LoopState::Done
                        }
                        Ok(ModelResponse::ToolCalls { content, calls }) => {
                            thread.push(ChatMessage::assistant_tool_calls(content, calls.clone()));
                            LoopState::AwaitingTools(calls)
                        }
                        Err(e) => {
                            tracing::warn!(thread_id = %thread_id, error = %e, "Model call failed");
                            let err = AgentError::ModelUnavailable(e);
                            thread.push(ChatMessage::assistant(err.reply_text()));
                            return Err(err);
                        }
                    }
                }
                LoopState::AwaitingTools(calls) => {
                    for call in &calls {
                        tracing::info!(
                            tool = %call.function.name,
                            call_id = %call.id,
                            args = %truncate_for_log(&call.function.arguments, 300),
                            "Calling tool"
                        );
                    }

                    // Calls run concurrently; results are recorded in request order.
                    let outputs = join_all(
                        calls
                            .iter()
                            .map(|call| self.tools.invoke(&call.function.name, &call.function.arguments)),
                    )
                    .await;

                    for (call, output) in calls.iter().zip(outputs) {
                        tracing::debug!(
                            call_id = %call.id,
                            output = %truncate_for_log(&output, 500),
                            "Tool result"
                        );
                        thread.push(ChatMessage::tool_result(call.id.clone(), output));
                    }

                    tool_calls += calls.len();
                    LoopState::AwaitingModel
                }
                LoopState::Done => {
                    let final_text = thread.last_assistant_text().unwrap_or_default();
                    tracing::info!(
                        thread_id = %thread_id,
                        iterations,
                        tool_calls,
                        history = thread.len(),
                        "Turn complete"
                    );
                    return Ok(AgentTurnResult {
                        thread_id: thread_id.to_string(),
                        final_text,
                        iterations,
                        tool_calls,
                    });
                }
            };
        }
    }
}

/// Truncate a string for logging purposes.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &s[..end])
}
