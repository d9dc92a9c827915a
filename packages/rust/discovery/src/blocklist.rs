//! Domain filter for reference candidates.

use refwriter_shared::SearchConfig;

/// Set of domain substrings that disqualify a reference URL.
///
/// Matching is a plain, case-sensitive substring test against the whole URL,
/// so `medium.com` also rejects `https://blog.medium.com/...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    domains: Vec<String>,
}

impl BlockList {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(Into::into)
                .filter(|d: &String| !d.is_empty())
                .collect(),
        }
    }

    /// Whether `url` contains any blocked domain.
    pub fn is_blocked(&self, url: &str) -> bool {
        self.domains.iter().any(|domain| url.contains(domain.as_str()))
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }
}

impl From<&SearchConfig> for BlockList {
    fn from(config: &SearchConfig) -> Self {
        Self::new(config.blocked_domains.iter().cloned())
    }
}
