//! Reference page fetching and text extraction.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use refwriter_shared::{ExtractorConfig, RefWriterError, Result};

use crate::paragraphs::{ParagraphLimits, extract_paragraphs};

/// Maximum number of redirects to follow for a reference page.
const MAX_REDIRECTS: usize = 5;

/// Fetches a reference page and reduces it to paragraph text.
#[derive(Debug, Clone)]
pub struct Extractor {
    client: Client,
    limits: ParagraphLimits,
}

impl Extractor {
    /// Create an extractor with the configured client identifier, timeout and limits.
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefWriterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            limits: ParagraphLimits {
                min_chars: config.min_paragraph_chars,
                max_chars: config.max_chars,
            },
        })
    }

    pub fn limits(&self) -> &ParagraphLimits {
        &self.limits
    }

    /// Fetch `url` once and return its extracted paragraph text.
    ///
    /// Any transport error, timeout or non-success status is an `Err`. A page
    /// with no qualifying paragraphs is `Ok("")`.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| RefWriterError::validation(format!("invalid reference URL {url}: {e}")))?;

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| RefWriterError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefWriterError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RefWriterError::Network(format!("{url}: body read failed: {e}")))?;

        let text = extract_paragraphs(&body, &self.limits);
        debug!(
            body_len = body.len(),
            text_chars = text.chars().count(),
            "extracted reference text"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor() -> Extractor {
        Extractor::new(&ExtractorConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn extracts_fixture_page() {
        let server = MockServer::start().await;
        let html = std::fs::read_to_string("../../../fixtures/html/reference-article.html")
            .expect("read html fixture");

        Mock::given(method("GET"))
            .and(path("/guide"))
            .and(header("user-agent", ExtractorConfig::default().user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .expect(1)
            .mount(&server)
            .await;

        let text = extractor()
            .extract(&format!("{}/guide", server.uri()))
            .await
            .unwrap();

        assert!(text.starts_with("Customer service chatbots have moved"));
        assert!(text.chars().count() <= 3000);
    }

    #[tokio::test]
    async fn non_success_status_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/paywalled"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = extractor()
            .extract(&format!("{}/paywalled", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, RefWriterError::Network(_)));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn slow_page_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>never arrives in time, never arrives in time, never.</p>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = ExtractorConfig {
            timeout_secs: 1,
            ..ExtractorConfig::default()
        };
        let err = Extractor::new(&config)
            .unwrap()
            .extract(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, RefWriterError::Network(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let err = extractor().extract("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, RefWriterError::Network(_)));
    }

    #[tokio::test]
    async fn malformed_url_is_error() {
        let err = extractor().extract("not a url").await.unwrap_err();
        assert!(matches!(err, RefWriterError::Validation { .. }));
    }

    #[tokio::test]
    async fn page_without_paragraphs_is_empty_ok() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body><p>Hi</p></body></html>"),
            )
            .mount(&server)
            .await;

        let text = extractor()
            .extract(&format!("{}/empty", server.uri()))
            .await
            .unwrap();
        assert!(text.is_empty());
    }
}
