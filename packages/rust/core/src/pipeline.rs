//! Batch pipeline: for each stored article, discover two references, extract
//! their text, rewrite the article in their style and persist the result.
//!
//! Articles are processed strictly one at a time. Every per-article failure
//! ends in an [`ArticleOutcome`]; only listing the snapshot can fail a batch.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use refwriter_crawler::Extractor;
use refwriter_discovery::{Discoverer, DiscoveryPolicy, SerpApiProvider};
use refwriter_shared::{
    ApiKeys, AppConfig, Article, ArticleId, ArticleUpdate, ReferenceCandidate, Result,
    WritePolicy,
};
use refwriter_storage::{ArticleStore, HttpArticleStore};

use crate::gemini::GeminiModel;
use crate::rewrite::RewriteEngine;

/// Number of references every rewrite is based on.
pub const REFERENCES_PER_ARTICLE: usize = 2;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Per-article processing states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Discovering,
    Extracting,
    Rewriting,
    Persisting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Discovering => "discovering",
            Self::Extracting => "extracting",
            Self::Rewriting => "rewriting",
            Self::Persisting => "persisting",
        }
    }
}

/// Why an article was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The article was rewritten by an earlier run.
    AlreadyUpdated,
    /// The search provider call failed.
    Discovery(String),
    /// Fewer admissible references than required.
    NotEnoughReferences { found: usize },
    /// A reference page could not be fetched.
    Extraction { url: String, reason: String },
    /// A reference page had no qualifying paragraphs.
    EmptyReference { url: String },
    /// The model call failed or its response was malformed.
    Rewrite(String),
    /// The model answered with blank text.
    EmptyRewrite,
    /// The article changed in storage after the snapshot was taken.
    Conflict,
}

impl SkipReason {
    /// The stage at which processing stopped.
    pub fn stage(&self) -> Stage {
        match self {
            Self::AlreadyUpdated => Stage::Pending,
            Self::Discovery(_) | Self::NotEnoughReferences { .. } => Stage::Discovering,
            Self::Extraction { .. } | Self::EmptyReference { .. } => Stage::Extracting,
            Self::Rewrite(_) | Self::EmptyRewrite => Stage::Rewriting,
            Self::Conflict => Stage::Persisting,
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyUpdated => write!(f, "already updated"),
            Self::Discovery(reason) => write!(f, "search failed: {reason}"),
            Self::NotEnoughReferences { found } => write!(
                f,
                "found {found} admissible reference(s), need {REFERENCES_PER_ARTICLE}"
            ),
            Self::Extraction { url, reason } => write!(f, "could not extract {url}: {reason}"),
            Self::EmptyReference { url } => write!(f, "no usable text at {url}"),
            Self::Rewrite(reason) => write!(f, "rewrite failed: {reason}"),
            Self::EmptyRewrite => write!(f, "model returned empty text"),
            Self::Conflict => write!(f, "article changed since the batch started"),
        }
    }
}

/// Terminal result of processing one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Updated,
    Skipped(SkipReason),
    /// Persisting the rewrite failed.
    Failed(String),
}

/// Summary of one batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    /// Articles in the snapshot.
    pub total: usize,
    pub updated: Vec<ArticleId>,
    /// Articles skipped because an earlier run already rewrote them.
    pub already_updated: usize,
    pub skipped: Vec<(ArticleId, SkipReason)>,
    pub failed: Vec<(ArticleId, String)>,
    pub elapsed: Duration,
}

impl BatchReport {
    fn new(batch_id: Uuid, total: usize) -> Self {
        Self {
            batch_id,
            total,
            updated: Vec::new(),
            already_updated: 0,
            skipped: Vec::new(),
            failed: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, id: &ArticleId, outcome: ArticleOutcome) {
        match outcome {
            ArticleOutcome::Updated => self.updated.push(id.clone()),
            ArticleOutcome::Skipped(SkipReason::AlreadyUpdated) => self.already_updated += 1,
            ArticleOutcome::Skipped(reason) => self.skipped.push((id.clone(), reason)),
            ArticleOutcome::Failed(reason) => self.failed.push((id.clone(), reason)),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before an article is processed (`current` is 1-based).
    fn article_started(&self, title: &str, current: usize, total: usize);
    /// Called once an article reached a terminal outcome.
    fn article_finished(&self, title: &str, outcome: &ArticleOutcome);
    /// Called when the batch completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn article_started(&self, _title: &str, _current: usize, _total: usize) {}
    fn article_finished(&self, _title: &str, _outcome: &ArticleOutcome) {}
    fn done(&self, _report: &BatchReport) {}
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Pacing, retry and write behaviour of a batch.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Wait before listing articles, for the storage API to come up.
    pub startup_delay: Duration,
    /// Pause between articles that made external calls.
    pub article_delay: Duration,
    /// Attempts per search, extraction and rewrite call (minimum 1).
    pub max_attempts: u32,
    pub write_policy: WritePolicy,
}

impl From<&AppConfig> for RunSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            startup_delay: Duration::from_millis(config.pipeline.startup_delay_ms),
            article_delay: Duration::from_millis(config.pipeline.article_delay_ms),
            max_attempts: config.pipeline.max_attempts,
            write_policy: config.storage.write_policy,
        }
    }
}

/// Assemble the persisted body: the rewrite followed by a numbered reference list.
pub fn format_final_content(rewritten: &str, references: &[String]) -> String {
    let mut content = format!("{rewritten}\n\n---\n\nReferences:\n");
    for (i, url) in references.iter().enumerate() {
        content.push_str(&format!("{}. {url}\n", i + 1));
    }
    content
}

/// Run `op` up to `max_attempts` times, returning the first success or the last error.
async fn with_attempts<T, F, Fut>(max_attempts: u32, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                debug!(what, attempt, max_attempts, error = %e, "attempt failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The batch runner and its collaborators.
pub struct Pipeline {
    store: Arc<dyn ArticleStore>,
    discoverer: Discoverer,
    extractor: Extractor,
    rewriter: RewriteEngine,
    settings: RunSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        discoverer: Discoverer,
        extractor: Extractor,
        rewriter: RewriteEngine,
        settings: RunSettings,
    ) -> Self {
        Self {
            store,
            discoverer,
            extractor,
            rewriter,
            settings,
        }
    }

    /// Wire the production collaborators: SerpAPI, Gemini and the article API.
    pub fn from_config(config: &AppConfig, keys: &ApiKeys) -> Result<Self> {
        let provider = SerpApiProvider::new(&config.search, keys.search.clone())?;
        let discoverer = Discoverer::new(Arc::new(provider), DiscoveryPolicy::from(&config.search));
        let extractor = Extractor::new(&config.extractor)?;
        let model = GeminiModel::new(&config.model, keys.model.clone())?;
        let store = HttpArticleStore::new(&config.storage)?;

        Ok(Self::new(
            Arc::new(store),
            discoverer,
            extractor,
            RewriteEngine::new(Arc::new(model)),
            RunSettings::from(config),
        ))
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Process every article of one storage snapshot.
    ///
    /// Fails only if the snapshot cannot be listed; per-article problems are
    /// recorded in the returned [`BatchReport`].
    #[instrument(skip_all)]
    pub async fn run_batch(&self, progress: &dyn ProgressReporter) -> Result<BatchReport> {
        let start = Instant::now();
        let batch_id = Uuid::now_v7();

        if !self.settings.startup_delay.is_zero() {
            progress.phase("Waiting for storage");
            tokio::time::sleep(self.settings.startup_delay).await;
        }

        progress.phase("Listing articles");
        let articles = self.store.list_articles().await?;
        let total = articles.len();
        info!(%batch_id, total, "starting batch");

        let mut report = BatchReport::new(batch_id, total);
        let mut paced = false;

        progress.phase("Rewriting articles");
        for (i, article) in articles.iter().enumerate() {
            progress.article_started(&article.title, i + 1, total);

            if !article.updated {
                if paced && !self.settings.article_delay.is_zero() {
                    tokio::time::sleep(self.settings.article_delay).await;
                }
                paced = true;
            }

            let outcome = self.process_article(article).await;
            progress.article_finished(&article.title, &outcome);
            report.record(&article.id, outcome);
        }

        report.elapsed = start.elapsed();
        info!(
            %batch_id,
            total,
            updated = report.updated.len(),
            already_updated = report.already_updated,
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch complete"
        );
        progress.done(&report);

        Ok(report)
    }

    /// Drive one article to a terminal outcome.
    #[instrument(skip_all, fields(article_id = %article.id))]
    pub async fn process_article(&self, article: &Article) -> ArticleOutcome {
        let outcome = self.advance(article).await;
        match &outcome {
            ArticleOutcome::Updated => info!(title = %article.title, "article updated"),
            ArticleOutcome::Skipped(SkipReason::AlreadyUpdated) => {
                debug!(title = %article.title, "already updated")
            }
            ArticleOutcome::Skipped(reason) => {
                warn!(title = %article.title, stage = reason.stage().as_str(), %reason, "article skipped")
            }
            ArticleOutcome::Failed(reason) => {
                error!(title = %article.title, %reason, "failed to persist article")
            }
        }
        outcome
    }

    async fn advance(&self, article: &Article) -> ArticleOutcome {
        if article.updated {
            return ArticleOutcome::Skipped(SkipReason::AlreadyUpdated);
        }

        let references = match self.discover(article).await {
            Ok(references) => references,
            Err(reason) => return ArticleOutcome::Skipped(reason),
        };

        let texts = match self.extract_all(&references).await {
            Ok(texts) => texts,
            Err(reason) => return ArticleOutcome::Skipped(reason),
        };

        let rewritten = match self.rewrite(article, &texts).await {
            Ok(rewritten) => rewritten,
            Err(reason) => return ArticleOutcome::Skipped(reason),
        };

        let links: Vec<String> = references.into_iter().map(|r| r.url).collect();
        let update = ArticleUpdate {
            content: format_final_content(&rewritten, &links),
            updated: true,
            references: links,
        };
        self.persist(article, &update).await
    }

    async fn discover(&self, article: &Article) -> std::result::Result<Vec<ReferenceCandidate>, SkipReason> {
        let title = article.title.as_str();
        let references = with_attempts(self.settings.max_attempts, "search", move || {
            self.discoverer.discover(title, REFERENCES_PER_ARTICLE)
        })
        .await
        .map_err(|e| SkipReason::Discovery(e.to_string()))?;

        if references.len() < REFERENCES_PER_ARTICLE {
            return Err(SkipReason::NotEnoughReferences {
                found: references.len(),
            });
        }
        Ok(references)
    }

    async fn extract_all(
        &self,
        references: &[ReferenceCandidate],
    ) -> std::result::Result<Vec<String>, SkipReason> {
        let mut texts = Vec::with_capacity(references.len());
        for reference in references {
            let url = reference.url.as_str();
            let text = with_attempts(self.settings.max_attempts, "extract", move || {
                self.extractor.extract(url)
            })
            .await
            .map_err(|e| SkipReason::Extraction {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

            if text.trim().is_empty() {
                return Err(SkipReason::EmptyReference {
                    url: url.to_string(),
                });
            }
            texts.push(text);
        }
        Ok(texts)
    }

    async fn rewrite(&self, article: &Article, texts: &[String]) -> std::result::Result<String, SkipReason> {
        let [first, second] = texts else {
            return Err(SkipReason::NotEnoughReferences { found: texts.len() });
        };
        let original = article.content.as_str();

        let rewritten = with_attempts(self.settings.max_attempts, "rewrite", move || {
            self.rewriter.rewrite(original, first, second)
        })
        .await
        .map_err(|e| SkipReason::Rewrite(e.to_string()))?;

        if rewritten.is_empty() {
            return Err(SkipReason::EmptyRewrite);
        }
        Ok(rewritten)
    }

    async fn persist(&self, article: &Article, update: &ArticleUpdate) -> ArticleOutcome {
        if self.settings.write_policy == WritePolicy::CompareAndSwap {
            match self.store.get_article(&article.id).await {
                Ok(current) if current.updated || current.updated_at != article.updated_at => {
                    return ArticleOutcome::Skipped(SkipReason::Conflict);
                }
                Ok(_) => {}
                Err(e) => return ArticleOutcome::Failed(e.to_string()),
            }
        }

        match self.store.update_article(&article.id, update).await {
            Ok(_) => ArticleOutcome::Updated,
            Err(e) => ArticleOutcome::Failed(e.to_string()),
        }
    }
}
