//! Core domain types for refwriter articles.
//!
//! Field names on the wire follow the article API (`_id`, `originalUrl`,
//! `isUpdated`, ...); Rust names follow what the fields mean.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// Opaque article identifier assigned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub String);

impl ArticleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A stored article, as returned by the storage collaborator.
///
/// `updated == true` implies `references` is non-empty and `content` holds
/// the rewritten body. The flag only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Storage identifier.
    #[serde(rename = "_id")]
    pub id: ArticleId,
    /// Article title, used as the reference search query.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Original or rewritten body text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Where the article was originally ingested from.
    #[serde(default, rename = "originalUrl", deserialize_with = "null_as_default")]
    pub source_url: String,
    /// Publication time, if the source exposed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Whether the pipeline has already rewritten this article.
    #[serde(default, rename = "isUpdated", deserialize_with = "null_as_default")]
    pub updated: bool,
    /// Reference URLs the rewrite was based on, in rank order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub references: Vec<String>,
    /// Last-modified timestamp maintained by the storage collaborator.
    /// Used as the revision for compare-and-swap writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Create a fresh, not-yet-updated article.
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: ArticleId(id.into()),
            title: title.into(),
            content: content.into(),
            source_url: String::new(),
            published_at: None,
            updated: false,
            references: Vec::new(),
            updated_at: None,
        }
    }

    /// Apply the pipeline-writable fields of `update` to this article.
    pub fn apply(&mut self, update: &ArticleUpdate) {
        self.content.clone_from(&update.content);
        self.updated = update.updated;
        self.references.clone_from(&update.references);
    }
}

/// Stored documents may carry explicit `null`s; read them as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// ArticleUpdate
// ---------------------------------------------------------------------------

/// The only fields the pipeline is allowed to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleUpdate {
    pub content: String,
    #[serde(rename = "isUpdated")]
    pub updated: bool,
    pub references: Vec<String>,
}

// ---------------------------------------------------------------------------
// ReferenceCandidate
// ---------------------------------------------------------------------------

/// A search result link with its provider rank (0-based). Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCandidate {
    pub url: String,
    pub rank: usize,
}
