//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use refwriter_shared::{ModelConfig, RefWriterError, Result};

use crate::rewrite::TextModel;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// [`TextModel`] backed by `POST {base_url}/v1/models/{model}:generateContent`.
pub struct GeminiModel {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiModel {
    pub fn new(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RefWriterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| RefWriterError::Rewrite(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefWriterError::Rewrite(format!("HTTP {status}")));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            RefWriterError::Rewrite(format!("invalid model response: {}", e.without_url()))
        })?;

        let text = body
            .first_text()
            .ok_or_else(|| RefWriterError::Rewrite("response has no candidate text".into()))?;
        debug!(chars = text.chars().count(), "model responded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_for(server: &MockServer) -> GeminiModel {
        let config = ModelConfig {
            base_url: server.uri(),
            ..ModelConfig::default()
        };
        GeminiModel::new(&config, "model-key").unwrap()
    }

    #[tokio::test]
    async fn reads_first_part_of_first_candidate() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "model-key"))
            .and(body_json(serde_json::json!({
                "contents": [{ "parts": [{ "text": "the prompt" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [
                    { "content": { "parts": [{ "text": "first" }, { "text": "second" }] } },
                    { "content": { "parts": [{ "text": "other candidate" }] } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = model_for(&server).generate("the prompt").await.unwrap();
        assert_eq!(text, "first");
    }

    #[tokio::test]
    async fn missing_candidate_path_is_rewrite_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let err = model_for(&server).generate("p").await.unwrap_err();
        assert!(matches!(err, RefWriterError::Rewrite(_)));
    }

    #[tokio::test]
    async fn http_error_is_rewrite_error_without_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = model_for(&server).generate("p").await.unwrap_err();
        assert!(matches!(err, RefWriterError::Rewrite(_)));
        assert!(!err.to_string().contains("model-key"));
    }

    #[test]
    fn debug_redacts_key() {
        let model = GeminiModel::new(&ModelConfig::default(), "secret-key").unwrap();
        assert!(!format!("{model:?}").contains("secret-key"));
    }
}
