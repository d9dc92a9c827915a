//! Reference discovery: web search plus domain filtering.
//!
//! Given an article title, the [`Discoverer`] asks a [`SearchProvider`] for
//! ranked results once, drops anything on the [`BlockList`], and keeps the
//! first few admissible links in provider order.

mod blocklist;
mod serpapi;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use refwriter_shared::{ReferenceCandidate, Result, SearchConfig};

pub use blocklist::BlockList;
pub use serpapi::SerpApiProvider;

// ---------------------------------------------------------------------------
// Provider seam
// ---------------------------------------------------------------------------

/// One ranked organic result from a search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHit {
    pub link: Option<String>,
    pub title: Option<String>,
}

impl SearchHit {
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            link: Some(url.into()),
            title: None,
        }
    }
}

/// A web search backend returning results in ranked order.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search. `num` is a result-count hint for the provider.
    async fn search(&self, query: &str, num: u32) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Discovery policy
// ---------------------------------------------------------------------------

/// Query shaping and admission rules for reference discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryPolicy {
    pub blocklist: BlockList,
    /// Terms appended to the query as `-term`.
    pub exclude_terms: Vec<String>,
    /// Free-text hint appended to the query (e.g. `blog OR article`).
    pub genre_hint: String,
    /// Result-count hint passed to the provider.
    pub result_count: u32,
}

impl From<&SearchConfig> for DiscoveryPolicy {
    fn from(config: &SearchConfig) -> Self {
        Self {
            blocklist: BlockList::from(config),
            exclude_terms: config.exclude_terms.clone(),
            genre_hint: config.genre_hint.clone(),
            result_count: config.result_count,
        }
    }
}

impl DiscoveryPolicy {
    /// Build the provider query for an article title.
    pub fn build_query(&self, title: &str) -> String {
        let mut parts: Vec<String> = vec![title.trim().to_string()];
        if !self.genre_hint.trim().is_empty() {
            parts.push(self.genre_hint.trim().to_string());
        }
        parts.extend(
            self.exclude_terms
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| format!("-{}", t.trim())),
        );
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Discoverer
// ---------------------------------------------------------------------------

/// Finds admissible reference URLs for an article.
#[derive(Clone)]
pub struct Discoverer {
    provider: Arc<dyn SearchProvider>,
    policy: DiscoveryPolicy,
}

impl Discoverer {
    pub fn new(provider: Arc<dyn SearchProvider>, policy: DiscoveryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &DiscoveryPolicy {
        &self.policy
    }

    /// Return up to `max_results` admissible links for `title`, in provider rank order.
    ///
    /// Results without a link are skipped; blocked links are logged and skipped.
    /// A provider failure is returned as-is; the caller decides what to do with it.
    #[instrument(skip_all, fields(title = %title, max_results = max_results))]
    pub async fn discover(&self, title: &str, max_results: usize) -> Result<Vec<ReferenceCandidate>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let query = self.policy.build_query(title);
        debug!(%query, "searching for references");

        let hits = self.provider.search(&query, self.policy.result_count).await?;

        let mut admitted = Vec::with_capacity(max_results);
        for (rank, hit) in hits.into_iter().enumerate() {
            let Some(link) = hit.link else {
                continue;
            };

            if self.policy.blocklist.is_blocked(&link) {
                warn!(url = %link, rank, "blocked reference source");
                continue;
            }

            admitted.push(ReferenceCandidate { url: link, rank });
            if admitted.len() == max_results {
                break;
            }
        }

        info!(found = admitted.len(), "reference discovery finished");
        Ok(admitted)
    }
}
