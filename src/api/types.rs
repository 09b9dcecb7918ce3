//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// `POST /chat` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation to continue; a new one is started when absent
    #[serde(default)]
    pub thread_id: Option<String>,

    /// The user's message
    pub message: String,
}

/// `POST /chat/image-url` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrlRequest {
    #[serde(default)]
    pub thread_id: Option<String>,

    /// Remote image URL, forwarded to the model as-is
    pub image_url: String,

    /// Question about the image (defaults to a description request)
    #[serde(default)]
    pub question: Option<String>,
}

/// Reply to any chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub thread_id: String,
    pub response: String,
}

/// Full history of a thread.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadHistoryResponse {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Acknowledgement of `DELETE /chat/{thread_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearThreadResponse {
    pub message: String,

    /// Whether the thread existed and was purged
    pub deleted: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
