//! Chat endpoints: text, image URL and image upload turns, plus thread
//! inspection and deletion.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use super::routes::AppState;
use super::types::{
    ChatRequest, ChatResponse, ClearThreadResponse, ErrorResponse, ImageUrlRequest,
    ThreadHistoryResponse,
};
use crate::llm::ChatMessage;
use crate::multimodal::{build_image_message, mime_from_path, ImageSource, DEFAULT_IMAGE_QUESTION};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Conversation {0} not found")]
    NotFound(String),

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Multipart(e) => e.status(),
        };
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Use the caller's thread id, or mint one when it is absent or blank.
fn resolve_thread_id(thread_id: Option<String>) -> String {
    thread_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Run one agent turn. Agent failures become the reply text.
async fn run_turn(state: &AppState, thread_id: String, message: ChatMessage) -> ChatResponse {
    let response = match state.agent.run(&thread_id, message).await {
        Ok(result) => result.final_text,
        Err(e) => {
            tracing::warn!(thread_id = %thread_id, error = %e, "Turn failed");
            e.reply_text().to_string()
        }
    };

    ChatResponse {
        thread_id,
        response,
    }
}

/// `POST /chat`
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }

    let thread_id = resolve_thread_id(body.thread_id);
    Ok(Json(
        run_turn(&state, thread_id, ChatMessage::user(body.message)).await,
    ))
}

/// `POST /chat/image-url`
pub async fn chat_image_url(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImageUrlRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let image_url = body.image_url.trim();
    if image_url.is_empty() {
        return Err(ApiError::BadRequest("image_url is required".to_string()));
    }

    let thread_id = resolve_thread_id(body.thread_id);
    let question = body.question.as_deref().unwrap_or(DEFAULT_IMAGE_QUESTION);
    let message = build_image_message(question, &ImageSource::Url(image_url.to_string()));

    Ok(Json(run_turn(&state, thread_id, message).await))
}

/// `POST /chat/image-file` (multipart: `file`, optional `question`, `thread_id`)
pub async fn chat_image_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let mut image: Option<ImageSource> = None;
    let mut question: Option<String> = None;
    let mut thread_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("image.jpg").to_string();
                let declared = field
                    .content_type()
                    .filter(|ct| ct.starts_with("image/"))
                    .map(str::to_string);
                let data = field.bytes().await?;
                let mime_type =
                    declared.unwrap_or_else(|| mime_from_path(FsPath::new(&file_name)).to_string());

                tracing::debug!(
                    file_name = %file_name,
                    mime_type = %mime_type,
                    bytes = data.len(),
                    "Received image upload"
                );
                image = Some(ImageSource::Bytes { data, mime_type });
            }
            Some("question") => question = Some(field.text().await?),
            Some("thread_id") => thread_id = Some(field.text().await?),
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    let thread_id = resolve_thread_id(thread_id);
    let question = question.as_deref().unwrap_or(DEFAULT_IMAGE_QUESTION);
    let message = build_image_message(question, &image);

    Ok(Json(run_turn(&state, thread_id, message).await))
}

/// `GET /chat/{thread_id}`
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<ThreadHistoryResponse>, ApiError> {
    let thread = state
        .agent
        .store()
        .snapshot(&thread_id)
        .await
        .ok_or_else(|| ApiError::NotFound(thread_id))?;

    Ok(Json(ThreadHistoryResponse {
        thread_id: thread.id().to_string(),
        messages: thread.messages().to_vec(),
        created_at: thread.created_at(),
        updated_at: thread.updated_at(),
    }))
}

/// `DELETE /chat/{thread_id}` - purges the thread's history.
pub async fn clear_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Json<ClearThreadResponse> {
    let deleted = state.agent.store().delete(&thread_id).await;
    tracing::info!(thread_id = %thread_id, deleted, "Cleared conversation");

    Json(ClearThreadResponse {
        message: format!("Conversation {} cleared.", thread_id),
        deleted,
    })
}
