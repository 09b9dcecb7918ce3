//! Research Assistant - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the chat API.

use research_assistant::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_assistant=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={} max_iterations={} search={}",
        config.model.model,
        config.max_iterations,
        if config.search.tavily_api_key.is_some() { "tavily" } else { "duckduckgo" }
    );

    // Start HTTP server
    info!("Starting server on {}", config.bind_addr());

    api::serve(config).await?;

    Ok(())
}
