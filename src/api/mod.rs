//! HTTP API for the research assistant.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /chat` - Ask a question (`{thread_id?, message}`)
//! - `POST /chat/image-url` - Ask about a remote image (`{thread_id?, image_url, question?}`)
//! - `POST /chat/image-file` - Ask about an uploaded image (multipart `file`, `question?`, `thread_id?`)
//! - `GET /chat/{thread_id}` - Conversation history
//! - `DELETE /chat/{thread_id}` - Forget a conversation

mod chat;
mod routes;
pub mod types;

pub use chat::ApiError;
pub use routes::{router, AppState};

use std::sync::Arc;

use crate::agent::Agent;
use crate::config::Config;
use crate::thread_store::{InMemoryThreadStore, ThreadStore};

/// Start the HTTP server and run until Ctrl-C / SIGTERM.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn ThreadStore> = Arc::new(InMemoryThreadStore::new());
    let persistent = store.is_persistent();
    let agent = Agent::from_config(&config, store)?;
    let tools: Vec<String> = agent.tools().list_tools().into_iter().map(|t| t.name).collect();
    tracing::info!(
        persistent,
        tools = ?tools,
        max_iterations = agent.max_iterations(),
        "Agent ready"
    );

    let addr = config.bind_addr();
    let state = Arc::new(AppState { agent, config });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
