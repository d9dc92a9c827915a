//! SerpAPI-backed search provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use refwriter_shared::{RefWriterError, Result, SearchConfig};

use crate::{SearchHit, SearchProvider};

/// Raw SerpAPI response; only the fields we read.
#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Google organic results via `GET {base_url}/search`.
pub struct SerpApiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for SerpApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerpApiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SerpApiProvider {
    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefWriterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for SerpApiProvider {
    async fn search(&self, query: &str, num: u32) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);
        let num = num.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            // The request URL carries the API key; keep it out of error text.
            .map_err(|e| RefWriterError::Search(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefWriterError::Search(format!("HTTP {status}")));
        }

        let body: SerpResponse = response
            .json()
            .await
            .map_err(|e| {
                RefWriterError::parse(format!("invalid search response: {}", e.without_url()))
            })?;

        // SerpAPI reports "no results" through `error` with a 200 status.
        if let Some(error) = &body.error {
            debug!(%error, "search provider returned a message");
        }

        Ok(body
            .organic_results
            .into_iter()
            .map(|r| SearchHit {
                link: r.link,
                title: r.title,
            })
            .collect())
    }
}
