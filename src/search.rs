use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::OracleError;
use crate::oracle::{SearchLocale, SearchProvider};
use crate::types::SearchHit;

/// Hard cap on results per query imposed by the search API.
pub const MAX_RESULTS: usize = 10;

const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}

/// Programmable web search over the Custom Search JSON API.
pub struct WebSearch {
    http: Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
}

impl WebSearch {
    pub fn new(
        api_key: String,
        engine_id: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create search HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key,
            engine_id,
        })
    }

    fn query_params(
        &self,
        query: &str,
        locale: &SearchLocale,
        max_results: usize,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("cx", self.engine_id.clone()),
            ("q", query.to_string()),
            ("num", max_results.clamp(1, MAX_RESULTS).to_string()),
            ("safe", locale.safe.clone()),
            ("lr", format!("lang_{}", locale.language)),
            ("cr", format!("country{}", locale.country.to_uppercase())),
        ]
    }
}

#[async_trait]
impl SearchProvider for WebSearch {
    async fn search(
        &self,
        query: &str,
        locale: &SearchLocale,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, OracleError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&self.query_params(query, locale, max_results))
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search returned an error status")?
            .json::<SearchResponse>()
            .await
            .map_err(|e| OracleError::malformed(format!("search response: {e}")))?;

        Ok(resp
            .items
            .into_iter()
            .take(max_results.min(MAX_RESULTS))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_params_encode_locale() {
        let search = WebSearch::new(
            "k".into(),
            "cx1".into(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let locale = SearchLocale {
            language: "en".into(),
            country: "gb".into(),
            safe: "off".into(),
        };
        let params = search.query_params("budget vote", &locale, 25);
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("num"), Some("10"));
        assert_eq!(get("lr"), Some("lang_en"));
        assert_eq!(get("cr"), Some("countryGB"));
        assert_eq!(get("safe"), Some("off"));
        assert_eq!(get("q"), Some("budget vote"));
    }

    #[test]
    fn test_response_items_are_optional() {
        let resp: SearchResponse = serde_json::from_str(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(resp.items.is_empty());

        let resp: SearchResponse = serde_json::from_str(
            r#"{"items": [{"title": "A", "link": "https://a.example", "snippet": "s", "displayLink": "a.example"}]}"#,
        )
        .unwrap();
        assert_eq!(resp.items[0].url, "https://a.example");
    }
}
