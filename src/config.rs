//! Configuration management for the research assistant.
//!
//! Configuration is read once at process start from environment variables:
//! - `OPENAI_API_KEY` - Required. Key for the chat-completions API.
//! - `OPENAI_BASE_URL` - Optional. API base URL. Defaults to `https://api.openai.com/v1`.
//! - `DEFAULT_MODEL` - Optional. Model identifier. Defaults to `gpt-4o-mini`.
//! - `MODEL_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0`.
//! - `MODEL_MAX_RETRIES` - Optional. Retries for transient model failures. Defaults to `2`.
//! - `TAVILY_API_KEY` - Optional. Enables Tavily search; DuckDuckGo is used otherwise.
//! - `SEARCH_MAX_RESULTS` - Optional. Default results per search. Defaults to `3`.
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations per turn. Defaults to `10`.
//! - `REQUEST_TIMEOUT_SECS` - Optional. Timeout for outbound model/search calls. Defaults to `60`.
//! - `MAX_UPLOAD_BYTES` - Optional. Upload limit for image files. Defaults to 20 MiB.
//!
//! The `research-chat` client in remote mode additionally reads `API_TIMEOUT_SECS`;
//! when unset, its timeout is derived from the turn limits above.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llm::BackoffConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Model client configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Chat-completions API key
    pub api_key: String,

    /// Base URL of an OpenAI-compatible API
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature (0 = deterministic reference configuration)
    pub temperature: f32,

    /// Retries for rate limits, overloads and 5xx responses
    pub max_retries: u32,
}

/// Web search configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Tavily API key; when absent the keyless DuckDuckGo provider is used
    pub tavily_api_key: Option<String>,

    /// Results returned when the model does not ask for a specific count
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            max_results: 3,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,

    pub search: SearchConfig,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum model invocations per turn
    pub max_iterations: usize,

    /// Timeout applied to every outbound model and search call
    pub request_timeout: Duration,

    /// Body limit for `/chat/image-file` uploads
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENAI_API_KEY` is not set, and
    /// `ConfigError::InvalidValue` for unparsable numeric settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let model = ModelConfig {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: env_parse("MODEL_TEMPERATURE", 0.0)?,
            max_retries: env_parse("MODEL_MAX_RETRIES", 2)?,
        };

        let search = SearchConfig {
            tavily_api_key: std::env::var("TAVILY_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            max_results: env_parse("SEARCH_MAX_RESULTS", 3)?,
        };

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env_parse("PORT", 8000)?;

        let max_iterations: usize = env_parse("MAX_ITERATIONS", 10)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let request_timeout = Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", 60)?);
        let max_upload_bytes = env_parse("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?;

        Ok(Self {
            model,
            search,
            host,
            port,
            max_iterations,
            request_timeout,
            max_upload_bytes,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(api_key: String) -> Self {
        Self {
            model: ModelConfig {
                api_key,
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                temperature: 0.0,
                max_retries: 2,
            },
            search: SearchConfig::default(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_iterations: 10,
            request_timeout: Duration::from_secs(60),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Longest one agent turn can take with these limits.
    pub fn turn_timeout(&self) -> Duration {
        turn_timeout(
            self.max_iterations,
            self.model.max_retries,
            self.request_timeout,
        )
    }
}

/// Every iteration may exhaust its model retries, each waiting the full
/// backoff cap, and then run one round of tool calls.
fn turn_timeout(max_iterations: usize, max_retries: u32, request_timeout: Duration) -> Duration {
    let model_call = request_timeout
        .saturating_add(BackoffConfig::default().max_delay)
        .saturating_mul(max_retries.saturating_add(1));
    let iteration = model_call.saturating_add(request_timeout);
    iteration.saturating_mul(u32::try_from(max_iterations).unwrap_or(u32::MAX))
}

/// Timeout for requests made by a remote client to a running server.
///
/// `API_TIMEOUT_SECS` wins; otherwise the server's turn limits are read from
/// the same variables the server uses, falling back to their defaults.
pub fn client_timeout_from_env() -> Result<Duration, ConfigError> {
    if let Ok(raw) = std::env::var("API_TIMEOUT_SECS") {
        return Ok(Duration::from_secs(parse_value("API_TIMEOUT_SECS", &raw)?));
    }

    Ok(turn_timeout(
        env_parse("MAX_ITERATIONS", 10)?,
        env_parse("MODEL_MAX_RETRIES", 2)?,
        Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", 60)?),
    ))
}

fn env_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_configuration() {
        let config = Config::new("sk-test".to_string());
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.temperature, 0.0);
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn turn_timeout_covers_every_iteration() {
        let mut config = Config::new("sk-test".to_string());
        // (60s request + 8s backoff cap) x 3 attempts + 60s of tools, ten times.
        assert_eq!(config.turn_timeout(), Duration::from_secs(2640));

        config.max_iterations = 1;
        config.model.max_retries = 0;
        config.request_timeout = Duration::from_secs(10);
        assert_eq!(config.turn_timeout(), Duration::from_secs(28));
    }

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        match err {
            ConfigError::InvalidValue(name, _) => assert_eq!(name, "PORT"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_value_trims_whitespace() {
        let port: u16 = parse_value("PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }
}
