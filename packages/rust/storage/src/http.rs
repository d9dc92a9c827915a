//! REST client for the article API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument};

use refwriter_shared::{
    Article, ArticleId, ArticleUpdate, RefWriterError, Result, StorageConfig,
};

use crate::ArticleStore;

/// [`ArticleStore`] backed by `GET /articles`, `GET /articles/{id}` and
/// `PUT /articles/{id}`.
#[derive(Debug, Clone)]
pub struct HttpArticleStore {
    client: Client,
    base_url: String,
}

impl HttpArticleStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefWriterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn article_url(&self, id: &ArticleId) -> String {
        format!("{}/articles/{}", self.base_url, id)
    }

    async fn find_in_list(&self, id: &ArticleId) -> Result<Article> {
        self.list_articles()
            .await?
            .into_iter()
            .find(|a| &a.id == id)
            .ok_or_else(|| RefWriterError::not_found(id.as_str()))
    }
}

/// Map transport failures and error statuses; 404 becomes `NotFound`.
fn check_status(response: Response, id: Option<&ArticleId>) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(RefWriterError::not_found(id.as_str()));
        }
    }
    if !status.is_success() {
        return Err(RefWriterError::Storage(format!(
            "{}: HTTP {status}",
            response.url()
        )));
    }
    Ok(response)
}

/// The API answers `null` for unknown ids instead of 404.
async fn read_article(response: Response, id: &ArticleId) -> Result<Article> {
    let body: Option<Article> = response
        .json()
        .await
        .map_err(|e| RefWriterError::parse(format!("invalid article response: {e}")))?;
    body.ok_or_else(|| RefWriterError::not_found(id.as_str()))
}

#[async_trait]
impl ArticleStore for HttpArticleStore {
    #[instrument(skip_all)]
    async fn list_articles(&self) -> Result<Vec<Article>> {
        let url = format!("{}/articles", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RefWriterError::Storage(format!("{url}: {e}")))?;

        let articles: Vec<Article> = check_status(response, None)?
            .json()
            .await
            .map_err(|e| RefWriterError::parse(format!("invalid article list: {e}")))?;

        debug!(count = articles.len(), "listed articles");
        Ok(articles)
    }

    #[instrument(skip_all, fields(article_id = %id))]
    async fn get_article(&self, id: &ArticleId) -> Result<Article> {
        let url = self.article_url(id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RefWriterError::Storage(format!("{url}: {e}")))?;

        // Deployments without a single-article route answer 404 here.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("no single-article route, reading the full list");
            return self.find_in_list(id).await;
        }

        read_article(check_status(response, Some(id))?, id).await
    }

    #[instrument(skip_all, fields(article_id = %id))]
    async fn update_article(&self, id: &ArticleId, update: &ArticleUpdate) -> Result<Article> {
        let url = self.article_url(id);
        let response = self
            .client
            .put(&url)
            .json(update)
            .send()
            .await
            .map_err(|e| RefWriterError::Storage(format!("{url}: {e}")))?;

        // The API may echo the document as it was before the write.
        let mut article = read_article(check_status(response, Some(id))?, id).await?;
        article.apply(update);
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> HttpArticleStore {
        HttpArticleStore::new(&StorageConfig {
            base_url: format!("{}/", server.uri()),
            ..StorageConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn lists_articles_from_fixture() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/articles.json")
            .expect("read articles fixture");

        Mock::given(method("GET"))
            .and(path("/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .mount(&server)
            .await;

        let articles = store_for(&server).list_articles().await.unwrap();
        assert_eq!(articles.len(), 3);
        assert!(!articles[0].updated);
        assert!(articles[2].updated);
        assert_eq!(articles[2].references.len(), 2);
    }

    #[tokio::test]
    async fn list_failure_is_storage_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/articles"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = store_for(&server).list_articles().await.unwrap_err();
        assert!(matches!(err, RefWriterError::Storage(_)));
    }

    #[tokio::test]
    async fn update_sends_writable_fields_and_returns_stored_article() {
        let server = MockServer::start().await;
        let update = ArticleUpdate {
            content: "REWRITTEN".into(),
            updated: true,
            references: vec!["https://a.example/".into(), "https://b.example/".into()],
        };

        Mock::given(method("PUT"))
            .and(path("/articles/a1"))
            .and(body_json(serde_json::json!({
                "content": "REWRITTEN",
                "isUpdated": true,
                "references": ["https://a.example/", "https://b.example/"],
            })))
            // Pre-update document, as returned by the API.
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_id": "a1",
                "title": "T",
                "content": "old",
                "isUpdated": false,
                "references": [],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stored = store_for(&server)
            .update_article(&ArticleId::from("a1"), &update)
            .await
            .unwrap();
        assert_eq!(stored.content, "REWRITTEN");
        assert!(stored.updated);
        assert_eq!(stored.title, "T");
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/articles/missing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let update = ArticleUpdate {
            content: "x".into(),
            updated: true,
            references: vec!["https://a.example/".into()],
        };
        let err = store_for(&server)
            .update_article(&ArticleId::from("missing"), &update)
            .await
            .unwrap_err();
        assert!(matches!(err, RefWriterError::NotFound { .. }));
    }

    #[tokio::test]
    async fn get_without_single_article_route_reads_the_list() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/json/articles.json")
            .expect("read articles fixture");
        let expected: Vec<Article> = serde_json::from_str(&fixture).expect("parse fixture");

        Mock::given(method("GET"))
            .and(path("/articles/65a1f0c2e4b0a1b2c3d4e5f2"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Cannot GET"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .expect(1)
            .mount(&server)
            .await;

        let article = store_for(&server)
            .get_article(&ArticleId::from("65a1f0c2e4b0a1b2c3d4e5f2"))
            .await
            .unwrap();
        assert_eq!(article, expected[1]);
    }

    #[tokio::test]
    async fn get_of_unknown_id_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/articles/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/articles"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .get_article(&ArticleId::from("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, RefWriterError::NotFound { .. }));
    }
}
