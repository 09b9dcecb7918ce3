//! Tool system for the research agent.
//!
//! Tools are declared to the model as functions. Invocation failures never
//! escape the registry's [`ToolRegistry::invoke`]: they are turned into text
//! the model can read and react to.

mod web;

pub use web::{DuckDuckGoSearch, SearchProvider, SearchResult, TavilySearch, WebSearch};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::SearchConfig;
use crate::llm::{FunctionDefinition, ToolDefinition};

/// A tool the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Name and description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Registry of the tools exposed to the model.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference tool set: web search only, backed by Tavily when a key is
    /// configured and by DuckDuckGo otherwise.
    pub fn research(search: &SearchConfig, timeout: Duration) -> anyhow::Result<Self> {
        let provider: Arc<dyn SearchProvider> = match &search.tavily_api_key {
            Some(key) => Arc::new(TavilySearch::new(key.clone(), timeout)?),
            None => {
                tracing::warn!("TAVILY_API_KEY not set, falling back to DuckDuckGo search");
                Arc::new(DuckDuckGoSearch::new(timeout)?)
            }
        };

        let mut registry = Self::new();
        registry.register(WebSearch::new(provider).with_max_results(search.max_results));
        Ok(registry)
    }

    /// Add a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered tools in registration order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    /// Function declarations for the model.
    pub fn get_tool_schemas(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect()
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;
        tool.execute(args).await
    }

    /// Execute a tool call with raw JSON arguments; failures become result text.
    pub async fn invoke(&self, name: &str, raw_args: &str) -> String {
        let args = if raw_args.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str::<Value>(raw_args) {
                Ok(args) => args,
                Err(e) => {
                    tracing::warn!(tool = %name, error = %e, "Malformed tool arguments");
                    return format!("Error: invalid arguments for tool '{}': {}", name, e);
                }
            }
        };

        match self.execute(name, args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool invocation failed");
                format!("Error: {}", e)
            }
        }
    }
}
