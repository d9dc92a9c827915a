//! In-process article store.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use refwriter_shared::{Article, ArticleId, ArticleUpdate, RefWriterError, Result};

use crate::ArticleStore;

/// [`ArticleStore`] holding articles in memory, in insertion order.
///
/// Every write bumps `updated_at`, like the real API does.
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    articles: Mutex<Vec<Article>>,
    updates: AtomicUsize,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        Self {
            articles: Mutex::new(articles.into_iter().collect()),
            updates: AtomicUsize::new(0),
        }
    }

    /// Insert or replace an article (by id), as an external writer would.
    pub fn put(&self, mut article: Article) -> Result<()> {
        article.updated_at = Some(Utc::now());
        let mut articles = self.lock()?;
        match articles.iter_mut().find(|a| a.id == article.id) {
            Some(existing) => *existing = article,
            None => articles.push(article),
        }
        Ok(())
    }

    /// Current copy of one article, if present.
    pub fn find(&self, id: &ArticleId) -> Option<Article> {
        self.lock()
            .ok()
            .and_then(|articles| articles.iter().find(|a| &a.id == id).cloned())
    }

    /// Number of successful `update_article` calls so far.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Article>>> {
        self.articles
            .lock()
            .map_err(|_| RefWriterError::Storage("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn list_articles(&self) -> Result<Vec<Article>> {
        Ok(self.lock()?.clone())
    }

    async fn get_article(&self, id: &ArticleId) -> Result<Article> {
        self.lock()?
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| RefWriterError::not_found(id.as_str()))
    }

    async fn update_article(&self, id: &ArticleId, update: &ArticleUpdate) -> Result<Article> {
        let mut articles = self.lock()?;
        let article = articles
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| RefWriterError::not_found(id.as_str()))?;

        article.apply(update);
        article.updated_at = Some(Utc::now());
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(article.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> ArticleUpdate {
        ArticleUpdate {
            content: "new".into(),
            updated: true,
            references: vec!["https://a.example/".into(), "https://b.example/".into()],
        }
    }

    #[tokio::test]
    async fn update_applies_and_counts() {
        let store = MemoryArticleStore::with_articles([
            Article::new("1", "One", "first"),
            Article::new("2", "Two", "second"),
        ]);

        let stored = store.update_article(&ArticleId::from("2"), &update()).await.unwrap();
        assert!(stored.updated);
        assert!(stored.updated_at.is_some());
        assert_eq!(store.update_count(), 1);

        let listed = store.list_articles().await.unwrap();
        assert_eq!(listed[0].content, "first");
        assert_eq!(listed[1].content, "new");
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemoryArticleStore::new();
        let err = store
            .update_article(&ArticleId::from("nope"), &update())
            .await
            .unwrap_err();
        assert!(matches!(err, RefWriterError::NotFound { .. }));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn put_replaces_and_bumps_revision() {
        let store = MemoryArticleStore::with_articles([Article::new("1", "One", "first")]);
        assert!(store.find(&ArticleId::from("1")).unwrap().updated_at.is_none());

        store.put(Article::new("1", "One", "edited elsewhere")).unwrap();
        let current = store.get_article(&ArticleId::from("1")).await.unwrap();
        assert_eq!(current.content, "edited elsewhere");
        assert!(current.updated_at.is_some());
        assert_eq!(store.list_articles().await.unwrap().len(), 1);
    }
}
