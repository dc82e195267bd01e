//! Web search tool backed by the Tavily API
//!
//! The model invokes this tool by name with a single `query` argument
//! whenever the user asks for live, recent or latest information. The
//! result set is rendered to plain text for the model to summarise.
//! Outbound calls are rate limited per minute.

use crate::config::SearchConfig;
use crate::error::{Result, SportmateError};
use crate::tools::{ToolExecutor, ToolResult};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Tavily API endpoint, overridable via `api_base` for tests
const DEFAULT_API_BASE: &str = "https://api.tavily.com";

/// Tool name the model calls; referenced by the system instruction
pub const SEARCH_TOOL_NAME: &str = "tavily_search";

/// Upper bound on the text handed back to the model
const MAX_RESULT_TEXT_BYTES: usize = 16_384;

/// Rate limiter for outbound search requests
///
/// Sliding-window limiter to keep the bridge from hammering the search
/// API when the model loops.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Maximum number of requests per minute
    max_requests_per_minute: u32,
    /// Request timestamps within the current window
    requests: Vec<std::time::SystemTime>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests_per_minute,
            requests: Vec::new(),
        }
    }

    /// Check if a request is allowed and record it
    ///
    /// # Errors
    ///
    /// Returns error if the per-minute limit is exceeded
    pub fn check_and_record(&mut self) -> Result<()> {
        let now = std::time::SystemTime::now();
        let one_minute_ago = now.checked_sub(Duration::from_secs(60)).unwrap_or(now);

        self.requests.retain(|&req_time| req_time > one_minute_ago);

        if self.requests.len() >= self.max_requests_per_minute as usize {
            return Err(SportmateError::Tool(format!(
                "Search rate limit exceeded: {} requests per minute",
                self.max_requests_per_minute
            ))
            .into());
        }

        self.requests.push(now);
        Ok(())
    }
}

/// Request body for the Tavily search endpoint
#[derive(Debug, Serialize)]
struct SearchRequest {
    query: String,
    max_results: usize,
    include_answer: bool,
}

/// Response body from the Tavily search endpoint
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<SearchResultItem>,
}

/// One search hit
#[derive(Debug, Deserialize)]
struct SearchResultItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily-backed web search tool
pub struct SearchTool {
    client: Client,
    config: SearchConfig,
    api_key: String,
    rate_limiter: std::sync::Arc<tokio::sync::Mutex<RateLimiter>>,
}

impl SearchTool {
    /// Create a new search tool
    ///
    /// # Errors
    ///
    /// Returns `SportmateError::MissingCredentials` if no API key is
    /// configured, or a tool error if the HTTP client cannot be built
    pub fn new(config: SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SportmateError::MissingCredentials("tavily".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("sportmate/0.1.0")
            .build()
            .map_err(|e| SportmateError::Tool(format!("Failed to create HTTP client: {}", e)))?;

        let rate_limiter = std::sync::Arc::new(tokio::sync::Mutex::new(RateLimiter::new(
            config.max_searches_per_minute,
        )));

        Ok(Self {
            client,
            config,
            api_key,
            rate_limiter,
        })
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        format!("{}/search", base)
    }

    /// Run a search and render the result set to text
    async fn search(&self, query: &str) -> Result<String> {
        self.rate_limiter.lock().await.check_and_record()?;

        let request = SearchRequest {
            query: query.to_string(),
            max_results: self.config.max_results,
            include_answer: true,
        };

        let url = self.endpoint();
        tracing::debug!("Searching: {}", query);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SportmateError::Tool(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Search API returned error {}: {}", status, error_text);
            return Err(SportmateError::Tool(format!(
                "Search API returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let search_response: SearchResponse = response.json().await.map_err(|e| {
            SportmateError::Tool(format!("Failed to parse search response: {}", e))
        })?;

        Ok(format_results(&search_response))
    }
}

/// Render a search response to the text fed back to the model
fn format_results(response: &SearchResponse) -> String {
    let mut text = String::new();

    if let Some(answer) = &response.answer {
        if !answer.is_empty() {
            text.push_str(answer);
            text.push('\n');
        }
    }

    for item in &response.results {
        text.push_str(&format!(
            "\n{} ({})\n{}\n",
            item.title, item.url, item.content
        ));
    }

    if text.is_empty() {
        text.push_str("No results found.");
    }

    text
}

#[async_trait]
impl ToolExecutor for SearchTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": SEARCH_TOOL_NAME,
            "description": "Search the web for live, recent or latest information. \
                Use this whenever the user asks about current scores, news or events.",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query"
                    }
                },
                "required": ["query"]
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|q| q.as_str())
            .ok_or_else(|| {
                SportmateError::Tool("Search tool requires a 'query' string argument".to_string())
            })?;

        if query.trim().is_empty() {
            return Ok(ToolResult::error("Search query is empty".to_string()));
        }

        let output = self.search(query).await?;
        Ok(ToolResult::success(output).truncate_if_needed(MAX_RESULT_TEXT_BYTES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tool() -> SearchTool {
        SearchTool::new(SearchConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = SearchTool::new(SearchConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_default_base() {
        let tool = test_tool();
        assert_eq!(tool.endpoint(), "https://api.tavily.com/search");
    }

    #[test]
    fn test_endpoint_custom_base() {
        let tool = SearchTool::new(SearchConfig {
            api_key: Some("test-key".to_string()),
            api_base: Some("http://localhost:7777/".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(tool.endpoint(), "http://localhost:7777/search");
    }

    #[test]
    fn test_tool_definition_shape() {
        let tool = test_tool();
        let definition = tool.tool_definition();
        assert_eq!(definition["name"], SEARCH_TOOL_NAME);
        assert_eq!(definition["parameters"]["required"][0], "query");
    }

    #[tokio::test]
    async fn test_execute_rejects_missing_query() {
        let tool = test_tool();
        let result = tool.execute(serde_json::json!({})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_query() {
        let tool = test_tool();
        let result = tool
            .execute(serde_json::json!({ "query": "   " }))
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_rate_limiter_allows_requests_within_limit() {
        let mut limiter = RateLimiter::new(3);
        assert!(limiter.check_and_record().is_ok());
        assert!(limiter.check_and_record().is_ok());
        assert!(limiter.check_and_record().is_ok());
    }

    #[test]
    fn test_rate_limiter_denies_requests_exceeding_limit() {
        let mut limiter = RateLimiter::new(2);
        assert!(limiter.check_and_record().is_ok());
        assert!(limiter.check_and_record().is_ok());
        assert!(limiter.check_and_record().is_err());
    }

    #[test]
    fn test_format_results_with_answer() {
        let response = SearchResponse {
            answer: Some("The final score was 2-1.".to_string()),
            results: vec![SearchResultItem {
                title: "Match report".to_string(),
                url: "https://example.com/report".to_string(),
                content: "Full coverage of the match.".to_string(),
            }],
        };

        let text = format_results(&response);
        assert!(text.starts_with("The final score was 2-1."));
        assert!(text.contains("Match report (https://example.com/report)"));
    }

    #[test]
    fn test_format_results_empty() {
        let response = SearchResponse {
            answer: None,
            results: vec![],
        };
        assert_eq!(format_results(&response), "No results found.");
    }
}
