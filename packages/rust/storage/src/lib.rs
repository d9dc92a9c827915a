//! Article storage collaborator.
//!
//! The pipeline does not own persistence. It reads a snapshot of all articles
//! and writes back a single article's content/flags through [`ArticleStore`].
//!
//! - [`HttpArticleStore`]: the article REST API (`/articles`)
//! - [`MemoryArticleStore`]: in-process store for tests and local runs

mod http;
mod memory;

use async_trait::async_trait;

use refwriter_shared::{Article, ArticleId, ArticleUpdate, Result};

pub use http::HttpArticleStore;
pub use memory::MemoryArticleStore;

/// Narrow storage contract consumed by the pipeline.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Full current snapshot of all articles.
    async fn list_articles(&self) -> Result<Vec<Article>>;

    /// Fetch one article; `NotFound` if it does not exist.
    async fn get_article(&self, id: &ArticleId) -> Result<Article>;

    /// Write the pipeline-owned fields of one article and return it as stored.
    /// `NotFound` if it does not exist.
    async fn update_article(&self, id: &ArticleId, update: &ArticleUpdate) -> Result<Article>;
}
