//! Router and shared state.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::chat;
use super::types::HealthResponse;
use crate::agent::Agent;
use crate::config::Config;

/// State shared by all handlers.
pub struct AppState {
    pub agent: Agent,
    pub config: Config,
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat::chat))
        .route("/chat/image-url", post(chat::chat_image_url))
        .route("/chat/image-file", post(chat::chat_image_file))
        .route(
            "/chat/:thread_id",
            get(chat::get_thread).delete(chat::clear_thread),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /health`
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
