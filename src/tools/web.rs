//! Web search tool and its search backends.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Tool;

const TAVILY_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS_CAP: usize = 10;

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` and return at most `max_results` hits, best first.
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchResult>>;

    fn provider_name(&self) -> &'static str;
}

/// Search the web through a [`SearchProvider`].
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
    max_results: usize,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            max_results: 3,
        }
    }

    /// Results returned when the model does not pass `max_results`.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_CAP);
        self
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns titles, URLs and snippets. Use for news, weather, prices, recent events and any fact that may have changed."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": format!("Maximum number of results to return (default: {})", self.max_results)
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let query = args["query"]
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;
        let max_results = args["max_results"]
            .as_u64()
            .map(|n| (n as usize).clamp(1, MAX_RESULTS_CAP))
            .unwrap_or(self.max_results);

        tracing::info!(
            provider = self.provider.provider_name(),
            query = %query,
            max_results,
            "Running web search"
        );

        let results = self.provider.search(query, max_results).await?;
        Ok(format_results(query, &results))
    }
}

/// Render hits as a numbered list for the model.
fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for: {}", query);
    }

    let mut output = format!("Search results for: {}\n", query);
    for (i, result) in results.iter().enumerate() {
        let _ = writeln!(output, "\n{}. {}", i + 1, result.title);
        let _ = writeln!(output, "   URL: {}", result.url);
        if !result.snippet.is_empty() {
            let _ = writeln!(output, "   {}", result.snippet);
        }
    }
    output
}

// ─────────────────────────────────────────────────────────────────────────────
// Tavily
// ─────────────────────────────────────────────────────────────────────────────

/// Tavily search API (<https://tavily.com>).
pub struct TavilySearch {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

#[derive(Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearch {
    pub fn new(api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            endpoint: TAVILY_URL.to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchResult>> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query,
                max_results,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Tavily search failed ({}): {}",
                status,
                body.chars().take(300).collect::<String>()
            ));
        }

        let parsed: TavilyResponse = response.json().await?;
        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|hit| SearchResult {
                title: hit.title,
                url: hit.url,
                snippet: hit.content,
            })
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "tavily"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DuckDuckGo (no API key)
// ─────────────────────────────────────────────────────────────────────────────

/// Keyless search through the DuckDuckGo HTML endpoint.
pub struct DuckDuckGoSearch {
    http: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; ResearchAssistant/1.0)")
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchResult>> {
        let url = format!(
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(query)
        );

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("DuckDuckGo search failed: HTTP {}", status));
        }

        let html = response.text().await?;
        Ok(extract_ddg_results(&html, max_results))
    }

    fn provider_name(&self) -> &'static str {
        "duckduckgo"
    }
}

/// Extract search results from DuckDuckGo HTML.
fn extract_ddg_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for chunk in html.split("class=\"result__body\"").skip(1) {
        if results.len() >= max_results {
            break;
        }

        let title = inner_text(chunk, "class=\"result__a\"");
        let snippet = inner_text(chunk, "class=\"result__snippet\"").unwrap_or_default();
        let url = inner_text(chunk, "class=\"result__url\"").unwrap_or_default();

        if let Some(title) = title.filter(|t| !t.is_empty()) {
            results.push(SearchResult {
                title: html_decode(&title),
                url: url.trim().to_string(),
                snippet: html_decode(&snippet),
            });
        }
    }

    results
}

/// Text content of the element whose opening tag carries `marker`.
///
/// Inline markup inside the element (DuckDuckGo bolds matched terms) is
/// stripped and whitespace collapsed.
fn inner_text(chunk: &str, marker: &str) -> Option<String> {
    let (_, rest) = chunk.split(marker).nth(1)?.split_once('>')?;
    let end = rest
        .find("</a>")
        .or_else(|| rest.find("</"))
        .unwrap_or(rest.len());
    Some(strip_tags(&rest[..end]))
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Basic HTML entity decoding.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedProvider {
        results: Vec<SearchResult>,
        requested: Mutex<Vec<(String, usize)>>,
    }

    impl FixedProvider {
        fn new(n: usize) -> Self {
            let results = (1..=n)
                .map(|i| SearchResult {
                    title: format!("Result {i}"),
                    url: format!("https://example.com/{i}"),
                    snippet: format!("Snippet {i}"),
                })
                .collect();
            Self {
                results,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FixedProvider {
        async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchResult>> {
            self.requested
                .lock()
                .unwrap()
                .push((query.to_string(), max_results));
            Ok(self.results.iter().take(max_results).cloned().collect())
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn search_defaults_to_three_results() {
        let provider = Arc::new(FixedProvider::new(5));
        let tool = WebSearch::new(provider.clone());

        let out = tool
            .execute(json!({"query": "weather in Paris today"}))
            .await
            .unwrap();

        assert!(out.starts_with("Search results for: weather in Paris today"));
        assert!(out.contains("1. Result 1"));
        assert!(out.contains("3. Result 3"));
        assert!(!out.contains("Result 4"));
        assert_eq!(
            provider.requested.lock().unwrap()[0],
            ("weather in Paris today".to_string(), 3)
        );
    }

    #[tokio::test]
    async fn search_caps_requested_results() {
        let provider = Arc::new(FixedProvider::new(0));
        let tool = WebSearch::new(provider.clone());

        tool.execute(json!({"query": "rust", "max_results": 500}))
            .await
            .unwrap();

        assert_eq!(provider.requested.lock().unwrap()[0].1, MAX_RESULTS_CAP);
    }

    #[tokio::test]
    async fn search_requires_query() {
        let tool = WebSearch::new(Arc::new(FixedProvider::new(1)));
        let err = tool.execute(json!({"query": "   "})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing 'query' argument");
    }

    #[test]
    fn empty_results_are_reported() {
        assert_eq!(format_results("nothing", &[]), "No results found for: nothing");
    }

    #[test]
    fn ddg_html_is_parsed_in_order() {
        let html = r##"
            <div class="result__body">
              <a class="result__a" href="/l/?u=a">Paris &amp; weather</a>
              <a class="result__snippet" href="#">Sunny, 21&#39;C</a>
              <a class="result__url" href="#"> meteo.fr </a>
            </div>
            <div class="result__body">
              <a class="result__a" href="/l/?u=b">Second</a>
              <a class="result__snippet" href="#">More</a>
              <a class="result__url" href="#">example.org</a>
            </div>
            <div class="result__body">
              <a class="result__a" href="/l/?u=c">Third</a>
            </div>
        "##;

        let results = extract_ddg_results(html, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Paris & weather");
        assert_eq!(results[0].snippet, "Sunny, 21'C");
        assert_eq!(results[0].url, "meteo.fr");
        assert_eq!(results[1].title, "Second");
    }

    #[test]
    fn ddg_highlighted_terms_are_kept() {
        let html = r##"
            <div class="result__body">
              <h2 class="result__title">
                <a class="result__a" href="/l/?u=a">The <b>Paris</b> <b>weather</b> today</a>
              </h2>
              <a class="result__snippet" href="#">Today in <b>Paris</b>: sunny,
                21&#39;C with a light breeze.</a>
              <a class="result__url" href="#">www.meteo.fr/<b>paris</b></a>
            </div>
        "##;

        let results = extract_ddg_results(html, 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "The Paris weather today");
        assert_eq!(
            results[0].snippet,
            "Today in Paris: sunny, 21'C with a light breeze."
        );
        assert_eq!(results[0].url, "www.meteo.fr/paris");
    }
}
