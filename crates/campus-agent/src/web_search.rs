//! Web search provider client (Google Custom Search JSON API).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use campus_core::config::WebSearchConfig;

use crate::error::AgentError;
use crate::model::truncate;

/// The API returns at most this many results per request.
const MAX_RESULTS_PER_REQUEST: u32 = 10;

/// One ranked web result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// A keyed search API returning ranked results for free text.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<WebResult>, AgentError>;
}

/// Google Programmable Search client.
pub struct GoogleSearch {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    engine_id: String,
    max_results: u32,
}

impl std::fmt::Debug for GoogleSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSearch")
            .field("base_url", &self.base_url)
            .field("engine_id", &self.engine_id)
            .field("api_key", &"[REDACTED]")
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl GoogleSearch {
    /// Build a client, or `None` when web search is disabled.
    pub fn from_config(config: &WebSearchConfig) -> Result<Option<Self>, AgentError> {
        if !config.enabled {
            return Ok(None);
        }

        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AgentError::Config("web search API key is not set".to_string()))?;
        let engine_id = config
            .engine_id
            .clone()
            .ok_or_else(|| AgentError::Config("web search engine id is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Some(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
            engine_id,
            max_results: config.max_results.clamp(1, MAX_RESULTS_PER_REQUEST),
        }))
    }
}

/// Extract results from a Custom Search response body.
///
/// A response without `items` means zero results, not an error.
pub(crate) fn parse_results(json: &serde_json::Value) -> Vec<WebResult> {
    json["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let link = item["link"].as_str()?.to_string();
                    Some(WebResult {
                        title: item["title"].as_str().unwrap_or("").to_string(),
                        link,
                        snippet: item["snippet"]
                            .as_str()
                            .unwrap_or("")
                            .split_whitespace()
                            .collect::<Vec<_>>()
                            .join(" "),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str) -> Result<Vec<WebResult>, AgentError> {
        let num = self.max_results.to_string();
        debug!(query_len = query.len(), "Running web search");

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AgentError::WebSearch(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::WebSearch(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(&text)
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::WebSearch(format!("invalid response body: {}", e)))?;

        let mut results = parse_results(&json);
        results.truncate(self.max_results as usize);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};

    fn enabled_config(base_url: &str) -> WebSearchConfig {
        WebSearchConfig {
            enabled: true,
            api_key: Some("g-key".to_string()),
            engine_id: Some("cx-1".to_string()),
            base_url: base_url.to_string(),
            ..WebSearchConfig::default()
        }
    }

    #[test]
    fn test_disabled_config_yields_none() {
        let cfg = WebSearchConfig {
            enabled: false,
            ..WebSearchConfig::default()
        };
        assert!(GoogleSearch::from_config(&cfg).unwrap().is_none());
    }

    #[test]
    fn test_enabled_without_key_is_config_error() {
        let cfg = WebSearchConfig::default();
        assert!(matches!(
            GoogleSearch::from_config(&cfg),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_max_results_clamped() {
        let mut cfg = enabled_config("http://localhost");
        cfg.max_results = 50;
        let client = GoogleSearch::from_config(&cfg).unwrap().unwrap();
        assert_eq!(client.max_results, 10);
    }

    #[test]
    fn test_parse_results() {
        let json = serde_json::json!({
            "items": [
                {"title": "CGU NIRF ranking", "link": "https://example.org/nirf", "snippet": "Ranked\n among  top"},
                {"title": "no link"},
                {"link": "https://example.org/bare"}
            ]
        });
        let results = parse_results(&json);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "Ranked among top");
        assert_eq!(results[1].title, "");
    }

    #[test]
    fn test_parse_results_without_items() {
        let json = serde_json::json!({"searchInformation": {"totalResults": "0"}});
        assert!(parse_results(&json).is_empty());
    }

    #[tokio::test]
    async fn test_search_sends_key_engine_and_query() {
        let router = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                Json(serde_json::json!({
                    "items": [{
                        "title": format!("{}|{}", params["key"], params["cx"]),
                        "link": "https://example.org",
                        "snippet": params["q"].clone(),
                    }]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let cfg = enabled_config(&format!("http://{}/search", addr));
        let client = GoogleSearch::from_config(&cfg).unwrap().unwrap();
        let results = client.search("cgu placement record 2024").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "g-key|cx-1");
        assert_eq!(results[0].snippet, "cgu placement record 2024");
    }
}
