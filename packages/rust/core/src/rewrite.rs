//! Rewrite engine: prompt construction plus one generative-model call.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use refwriter_shared::Result;

// ---------------------------------------------------------------------------
// Model seam
// ---------------------------------------------------------------------------

/// A generative text model taking a single prompt.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Run one request and return the first candidate's first text part.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Build the rewrite prompt for an original article and two reference texts.
pub fn build_rewrite_prompt(original: &str, reference_1: &str, reference_2: &str) -> String {
    format!(
        "Rewrite the original article so it covers the same subject matter, \
using the tone, structure, and formatting style of the reference articles.\n\
\n\
ORIGINAL ARTICLE:\n\
{original}\n\
\n\
REFERENCE ARTICLE 1:\n\
{reference_1}\n\
\n\
REFERENCE ARTICLE 2:\n\
{reference_2}\n\
\n\
Return ONLY the rewritten article content.\n\
No explanations or markdown."
    )
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Rewrites an article in the style of two references.
#[derive(Clone)]
pub struct RewriteEngine {
    model: Arc<dyn TextModel>,
}

impl RewriteEngine {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Returns the trimmed model output. An empty string means the model
    /// answered with nothing usable; the caller decides what that means.
    #[instrument(skip_all, fields(model = %self.model.name()))]
    pub async fn rewrite(
        &self,
        original: &str,
        reference_1: &str,
        reference_2: &str,
    ) -> Result<String> {
        let prompt = build_rewrite_prompt(original, reference_1, reference_2);
        debug!(prompt_chars = prompt.chars().count(), "requesting rewrite");

        let text = self.model.generate(&prompt).await?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use refwriter_shared::RefWriterError;

    struct EchoModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextModel for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct BrokenModel;

    #[async_trait]
    impl TextModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(RefWriterError::Rewrite("HTTP 500".into()))
        }
    }

    #[test]
    fn prompt_places_inputs_in_order() {
        let prompt = build_rewrite_prompt("ORIG", "REF-ONE", "REF-TWO");

        let orig = prompt.find("ORIGINAL ARTICLE:\nORIG\n").unwrap();
        let one = prompt.find("REFERENCE ARTICLE 1:\nREF-ONE\n").unwrap();
        let two = prompt.find("REFERENCE ARTICLE 2:\nREF-TWO\n").unwrap();
        assert!(orig < one && one < two);
        assert!(prompt.starts_with("Rewrite the original article"));
        assert!(prompt.ends_with("No explanations or markdown."));
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(
            build_rewrite_prompt("a", "b", "c"),
            build_rewrite_prompt("a", "b", "c")
        );
    }

    #[tokio::test]
    async fn rewrite_sends_one_prompt_and_trims() {
        let model = Arc::new(EchoModel {
            reply: "\n  REWRITTEN  \n".into(),
            prompts: Mutex::new(Vec::new()),
        });
        let engine = RewriteEngine::new(model.clone());

        let text = engine.rewrite("orig", "r1", "r2").await.unwrap();
        assert_eq!(text, "REWRITTEN");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], build_rewrite_prompt("orig", "r1", "r2"));
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let engine = RewriteEngine::new(Arc::new(BrokenModel));
        let err = engine.rewrite("o", "a", "b").await.unwrap_err();
        assert!(matches!(err, RefWriterError::Rewrite(_)));
    }
}
