//! System prompt for the research agent.

use chrono::NaiveDate;

use crate::tools::ToolRegistry;

/// Build the system prompt for a turn started on `today`.
pub fn build_system_prompt(today: NaiveDate, tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a Personal Research Assistant. Your job is to help users research topics thoroughly and accurately.

Today's date is {today}.

## Available Tools
{tool_descriptions}

## When answering questions
- Use the search tool to find up-to-date information when needed
- ALWAYS use the search tool for: weather, news, current events, prices, or anything time-sensitive
- Never guess or make up weather, dates, or real-time data - search for it instead
- Synthesize information from multiple sources when available
- Be concise but comprehensive
- If an image is provided, analyze it and incorporate your observations into the answer"#,
        today = today.format("%A, %B %d, %Y"),
        tool_descriptions = tool_descriptions
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_mentions_date_and_tools() {
        let mut tools = ToolRegistry::new();
        tools.register(crate::tools::WebSearch::new(std::sync::Arc::new(
            NoResults,
        )));

        let prompt = build_system_prompt(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(), &tools);

        assert!(prompt.contains("Today's date is Sunday, October 18, 2026."));
        assert!(prompt.contains("- **web_search**:"));
        assert!(prompt.contains("If an image is provided"));
    }

    struct NoResults;

    #[async_trait::async_trait]
    impl crate::tools::SearchProvider for NoResults {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> anyhow::Result<Vec<crate::tools::SearchResult>> {
            Ok(Vec::new())
        }

        fn provider_name(&self) -> &'static str {
            "none"
        }
    }
}
