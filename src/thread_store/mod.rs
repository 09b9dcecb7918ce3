//! Conversation threads and their storage.
//!
//! A thread is created lazily the first time its id is used and keeps an
//! append-only message history. Each thread sits behind its own lock: a turn
//! holds it for its whole duration, so turns on one thread run one after the
//! other while distinct threads never contend.

mod memory;

pub use memory::InMemoryThreadStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::llm::{ChatMessage, Role};

/// Shared, lockable handle to one thread.
pub type ThreadHandle = Arc<Mutex<Thread>>;

/// A conversation session.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    id: String,
    messages: Vec<ChatMessage>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a message. Messages are never edited or removed.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Text of the most recent assistant message without pending tool calls.
    pub fn last_assistant_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.has_tool_calls())
            .map(ChatMessage::text)
    }
}

/// Storage for conversation threads.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Whether threads survive a restart.
    fn is_persistent(&self) -> bool;

    /// Handle for `id`, creating an empty thread if it has never been seen.
    async fn get_or_create(&self, id: &str) -> ThreadHandle;

    /// Handle for `id` if the thread exists.
    async fn get(&self, id: &str) -> Option<ThreadHandle>;

    /// Append one message to `id`, creating the thread if needed.
    async fn append(&self, id: &str, message: ChatMessage) {
        let handle = self.get_or_create(id).await;
        handle.lock().await.push(message);
    }

    /// Copy of the thread's current state.
    async fn snapshot(&self, id: &str) -> Option<Thread> {
        let handle = self.get(id).await?;
        let thread = handle.lock().await;
        Some(thread.clone())
    }

    /// Remove a thread. Returns whether it existed.
    async fn delete(&self, id: &str) -> bool;

    /// Number of live threads.
    async fn len(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;

    #[test]
    fn last_assistant_text_skips_tool_call_messages() {
        let mut thread = Thread::new("t1");
        thread.push(ChatMessage::user("weather?"));
        thread.push(ChatMessage::assistant("old answer"));
        thread.push(ChatMessage::assistant_tool_calls(
            Some("Let me check.".to_string()),
            vec![ToolCall::new("call_1", "web_search", "{}")],
        ));
        thread.push(ChatMessage::tool_result("call_1", "sunny"));

        assert_eq!(thread.last_assistant_text().as_deref(), Some("old answer"));

        thread.push(ChatMessage::assistant("It is sunny."));
        assert_eq!(thread.last_assistant_text().as_deref(), Some("It is sunny."));
    }

    #[test]
    fn new_thread_is_empty() {
        let thread = Thread::new("fresh");
        assert!(thread.is_empty());
        assert_eq!(thread.last_assistant_text(), None);
        assert_eq!(thread.created_at(), thread.updated_at());
    }
}
