//! Client for a running research-assistant server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::types::{
    ChatRequest, ChatResponse, ClearThreadResponse, ErrorResponse, HealthResponse, ImageUrlRequest,
};
use crate::multimodal::mime_from_path;

/// Timeout for a whole request, including the agent turn it triggers. Matches
/// the worst case of a server running with default limits.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2640);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot reach the server at {0}. Make sure `research-assistant` is running.")]
    Connection(String),

    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Server error ({status}): {detail}")]
    Http { status: u16, detail: String },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode(response).await
    }

    pub async fn chat(&self, thread_id: &str, message: &str) -> Result<ChatResponse, ClientError> {
        let body = ChatRequest {
            thread_id: Some(thread_id.to_string()),
            message: message.to_string(),
        };
        let response = self
            .http
            .post(self.url("/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode(response).await
    }

    pub async fn chat_image_url(
        &self,
        thread_id: &str,
        image_url: &str,
        question: &str,
    ) -> Result<ChatResponse, ClientError> {
        let body = ImageUrlRequest {
            thread_id: Some(thread_id.to_string()),
            image_url: image_url.to_string(),
            question: Some(question.to_string()),
        };
        let response = self
            .http
            .post(self.url("/chat/image-url"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode(response).await
    }

    /// Upload a local image. A missing file is reported before any request.
    pub async fn chat_image_file(
        &self,
        thread_id: &str,
        path: &Path,
        question: &str,
    ) -> Result<ChatResponse, ClientError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::FileNotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ClientError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.jpg")
            .to_string();
        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime_from_path(path))?;
        let form = Form::new()
            .text("thread_id", thread_id.to_string())
            .text("question", question.to_string())
            .part("file", part);

        let response = self
            .http
            .post(self.url("/chat/image-file"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode(response).await
    }

    pub async fn clear_thread(&self, thread_id: &str) -> Result<ClearThreadResponse, ClientError> {
        let url = self.url(&format!("/chat/{}", urlencoding::encode(thread_id)));
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        decode(response).await
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_connect() {
            ClientError::Connection(self.base_url.clone())
        } else if err.is_timeout() {
            ClientError::Timeout(self.base_url.clone())
        } else {
            ClientError::Request(err)
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.detail)
        .unwrap_or(text);
    Err(ClientError::Http {
        status: status.as_u16(),
        detail,
    })
}
