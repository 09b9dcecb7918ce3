//! Interactive terminal chat with the research assistant.
//!
//! Runs the agent in-process by default. When `API_URL` is set, talks to a
//! running `research-assistant` server instead.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use research_assistant::agent::Agent;
use research_assistant::client::ApiClient;
use research_assistant::config::{self, Config};
use research_assistant::llm::ChatMessage;
use research_assistant::multimodal::{
    build_image_message, image_message_from_file, ImageSource, DEFAULT_IMAGE_QUESTION,
};
use research_assistant::thread_store::InMemoryThreadStore;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const HELP_TEXT: &str = "
Research Assistant - Commands
---------------------------------------
  <question>      Ask any research question (web search included)
  /image-url      Attach an image via URL and ask about it
  /image-file     Attach a local image file and ask about it
  /new            Start a fresh conversation (clears memory)
  /help           Show this help message
  /quit           Exit the assistant
";

enum Turn {
    Text(String),
    ImageUrl { url: String, question: String },
    ImageFile { path: PathBuf, question: String },
}

enum Backend {
    Local(Agent),
    Remote(ApiClient),
}

impl Backend {
    async fn ask(&self, thread_id: &str, turn: Turn) -> anyhow::Result<String> {
        match self {
            Backend::Local(agent) => {
                let message = match turn {
                    Turn::Text(text) => ChatMessage::user(text),
                    Turn::ImageUrl { url, question } => {
                        build_image_message(&question, &ImageSource::Url(url))
                    }
                    Turn::ImageFile { path, question } => {
                        image_message_from_file(&question, &path).await?
                    }
                };
                Ok(match agent.run(thread_id, message).await {
                    Ok(result) => result.final_text,
                    Err(e) => e.reply_text().to_string(),
                })
            }
            Backend::Remote(client) => {
                let response = match turn {
                    Turn::Text(text) => client.chat(thread_id, &text).await?,
                    Turn::ImageUrl { url, question } => {
                        client.chat_image_url(thread_id, &url, &question).await?
                    }
                    Turn::ImageFile { path, question } => {
                        client.chat_image_file(thread_id, &path, &question).await?
                    }
                };
                Ok(response.response)
            }
        }
    }

    /// Drop a finished conversation's history.
    async fn forget(&self, thread_id: &str) {
        match self {
            Backend::Local(agent) => {
                agent.store().delete(thread_id).await;
            }
            Backend::Remote(client) => {
                if let Err(e) = client.clear_thread(thread_id).await {
                    tracing::debug!(thread_id = %thread_id, error = %e, "Failed to clear remote thread");
                }
            }
        }
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> anyhow::Result<Option<String>> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

async fn ask_question(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<String> {
    let question = prompt(lines, "Your question about the image: ")
        .await?
        .unwrap_or_default();
    Ok(if question.is_empty() {
        DEFAULT_IMAGE_QUESTION.to_string()
    } else {
        question
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_assistant=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let backend = match std::env::var("API_URL").ok().filter(|v| !v.trim().is_empty()) {
        Some(url) => Backend::Remote(ApiClient::with_timeout(
            &url,
            config::client_timeout_from_env()?,
        )?),
        None => {
            let config = Config::from_env()?;
            Backend::Local(Agent::from_config(
                &config,
                Arc::new(InMemoryThreadStore::new()),
            )?)
        }
    };

    println!("Research Assistant");
    if let Backend::Remote(client) = &backend {
        println!("Connected to {}", client.base_url());
    }
    println!("Type /help for available commands.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut thread_id = Uuid::new_v4().to_string();

    loop {
        let Some(input) = prompt(&mut lines, "You: ").await? else {
            println!("\nGoodbye!");
            break;
        };

        let turn = match input.as_str() {
            "" => continue,
            "/quit" => {
                println!("Goodbye!");
                break;
            }
            "/help" => {
                println!("{}", HELP_TEXT);
                continue;
            }
            "/new" => {
                backend.forget(&thread_id).await;
                thread_id = Uuid::new_v4().to_string();
                println!("Started a new conversation. Previous context cleared.\n");
                continue;
            }
            "/image-url" => {
                let url = prompt(&mut lines, "Image URL: ").await?.unwrap_or_default();
                if url.is_empty() {
                    println!("No URL provided.\n");
                    continue;
                }
                let question = ask_question(&mut lines).await?;
                Turn::ImageUrl { url, question }
            }
            "/image-file" => {
                let path = prompt(&mut lines, "Image file path: ")
                    .await?
                    .unwrap_or_default();
                if path.is_empty() {
                    println!("No path provided.\n");
                    continue;
                }
                let question = ask_question(&mut lines).await?;
                Turn::ImageFile {
                    path: PathBuf::from(path),
                    question,
                }
            }
            _ => Turn::Text(input),
        };

        print!("\nAssistant: ");
        std::io::stdout().flush()?;
        match backend.ask(&thread_id, turn).await {
            Ok(answer) => println!("{}\n", answer),
            Err(e) => println!("{}\n", e),
        }
    }

    Ok(())
}
