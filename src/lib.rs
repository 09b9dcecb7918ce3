//! # Research Assistant
//!
//! A conversational research agent with web search and image understanding.
//!
//! This library provides:
//! - An HTTP API for chat turns, keyed by conversation thread
//! - A tool-based agent loop that searches the web before answering
//! - A client for OpenAI-compatible chat-completion APIs
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a user message for a thread via the API
//! 2. Build context with the system prompt, thread history and available tools
//! 3. Call the model, execute any requested tool calls
//! 4. Feed results back to the model, repeat until it answers
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use research_assistant::{agent::Agent, config::Config, llm::ChatMessage};
//! use research_assistant::thread_store::InMemoryThreadStore;
//!
//! let config = Config::from_env()?;
//! let agent = Agent::from_config(&config, Arc::new(InMemoryThreadStore::new()))?;
//! let result = agent.run("thread-1", ChatMessage::user("What's new in Rust?")).await?;
//! println!("{}", result.final_text);
//! ```

pub mod agent;
pub mod api;
pub mod client;
pub mod config;
pub mod llm;
pub mod multimodal;
pub mod thread_store;
pub mod tools;

pub use config::Config;
