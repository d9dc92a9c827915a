//! Application configuration for refwriter.
//!
//! User config lives at `~/.refwriter/refwriter.toml`.
//! `--config` selects a different file; a missing file means defaults.
//! API keys are never stored in the file; it only names the env vars.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RefWriterError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "refwriter.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".refwriter";

/// Browser-like client identifier for reference page fetches.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching refwriter.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search provider and reference admission policy.
    #[serde(default)]
    pub search: SearchConfig,

    /// Generative model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Reference page extraction.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Article storage API.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Batch pacing and retry.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the SerpAPI key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Provider base URL (overridable for testing).
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Result-count hint sent to the provider.
    #[serde(default = "default_result_count")]
    pub result_count: u32,

    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Terms appended to the query as `-term` exclusions.
    #[serde(default = "default_exclude_terms")]
    pub exclude_terms: Vec<String>,

    /// Genre hint appended to the query.
    #[serde(default = "default_genre_hint")]
    pub genre_hint: String,

    /// Domain substrings a reference URL must not contain.
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            base_url: default_search_base_url(),
            result_count: default_result_count(),
            timeout_secs: default_api_timeout(),
            exclude_terms: default_exclude_terms(),
            genre_hint: default_genre_hint(),
            blocked_domains: default_blocked_domains(),
        }
    }
}

fn default_search_key_env() -> String {
    "SERPAPI_KEY".into()
}
fn default_search_base_url() -> String {
    "https://serpapi.com".into()
}
fn default_result_count() -> u32 {
    10
}
fn default_api_timeout() -> u64 {
    30
}
fn default_exclude_terms() -> Vec<String> {
    ["reddit", "medium", "researchgate"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_genre_hint() -> String {
    "blog OR article".into()
}
fn default_blocked_domains() -> Vec<String> {
    [
        "sciencedirect.com",
        "elsevier.com",
        "springer.com",
        "ieee.org",
        "researchgate.net",
        "reddit.com",
        "medium.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of the env var holding the generative model API key.
    #[serde(default = "default_model_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model_base_url")]
    pub base_url: String,

    /// Model identifier used in the `generateContent` path.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_model_key_env(),
            base_url: default_model_base_url(),
            model: default_model(),
            timeout_secs: default_model_timeout(),
        }
    }
}

fn default_model_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_model_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_model_timeout() -> u64 {
    60
}

/// `[extractor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Per-page fetch timeout.
    #[serde(default = "default_extract_timeout")]
    pub timeout_secs: u64,

    /// Paragraphs must be strictly longer than this (trimmed, in chars).
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,

    /// Cap on the extracted text, in chars.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_extract_timeout(),
            min_paragraph_chars: default_min_paragraph_chars(),
            max_chars: default_max_chars(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_extract_timeout() -> u64 {
    8
}
fn default_min_paragraph_chars() -> usize {
    50
}
fn default_max_chars() -> usize {
    3000
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

/// How the runner guards against concurrent writers to the same article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritePolicy {
    /// Write unconditionally; a concurrent external edit is overwritten.
    #[default]
    LastWriterWins,
    /// Re-read the article before writing and skip it if its revision moved.
    CompareAndSwap,
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the article API.
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,

    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub write_policy: WritePolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_base_url(),
            timeout_secs: default_api_timeout(),
            write_policy: WritePolicy::default(),
        }
    }
}

fn default_storage_base_url() -> String {
    "http://127.0.0.1:5000".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Wait before the batch starts, giving the storage API time to come up.
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,

    /// Pause between consecutive articles (provider rate limits).
    #[serde(default = "default_article_delay")]
    pub article_delay_ms: u64,

    /// Attempts per search/extract/rewrite call. 1 means no retry.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: default_startup_delay(),
            article_delay_ms: default_article_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_startup_delay() -> u64 {
    2000
}
fn default_article_delay() -> u64 {
    1500
}
fn default_max_attempts() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.refwriter/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RefWriterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.refwriter/refwriter.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RefWriterError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RefWriterError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RefWriterError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RefWriterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RefWriterError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

/// Resolved secrets for the external providers.
#[derive(Clone)]
pub struct ApiKeys {
    pub search: String,
    pub model: String,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("search", &"<redacted>")
            .field("model", &"<redacted>")
            .finish()
    }
}

/// Read both provider keys from the env vars named in the config.
///
/// Fails with a [`RefWriterError::Config`] naming the first missing variable.
pub fn resolve_api_keys(config: &AppConfig) -> Result<ApiKeys> {
    Ok(ApiKeys {
        search: resolve_search_key(config)?,
        model: read_key(&config.model.api_key_env, "generative model")?,
    })
}

/// Read only the search provider key, for commands that never call the model.
pub fn resolve_search_key(config: &AppConfig) -> Result<String> {
    read_key(&config.search.api_key_env, "search provider")
}

fn read_key(var_name: &str, what: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(RefWriterError::config(format!(
            "{what} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("SERPAPI_KEY"));
        assert!(toml_str.contains("GOOGLE_API_KEY"));
        assert!(toml_str.contains("last-writer-wins"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let toml_str = r#"
[search]
blocked_domains = ["pinterest.com"]

[storage]
base_url = "http://articles.internal:8080"
write_policy = "compare-and-swap"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.search.blocked_domains, vec!["pinterest.com".to_string()]);
        assert_eq!(config.search.genre_hint, "blog OR article");
        assert_eq!(config.storage.write_policy, WritePolicy::CompareAndSwap);
        assert_eq!(config.extractor.max_chars, 3000);
        assert_eq!(config.pipeline.article_delay_ms, 1500);
        assert_eq!(config.pipeline.max_attempts, 1);
    }

    #[test]
    fn defaults_match_observed_limits() {
        let config = AppConfig::default();
        assert_eq!(config.extractor.timeout_secs, 8);
        assert_eq!(config.extractor.min_paragraph_chars, 50);
        assert_eq!(config.pipeline.startup_delay_ms, 2000);
        assert!(config.search.blocked_domains.contains(&"medium.com".to_string()));
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let mut config = AppConfig::default();
        // Unique env var names to avoid interfering with other tests
        config.search.api_key_env = "RW_TEST_NONEXISTENT_SEARCH_KEY_91823".into();
        config.model.api_key_env = "RW_TEST_NONEXISTENT_MODEL_KEY_91823".into();
        let err = resolve_api_keys(&config).unwrap_err();
        assert!(matches!(err, RefWriterError::Config { .. }));
        assert!(err.to_string().contains("RW_TEST_NONEXISTENT_SEARCH_KEY_91823"));
    }

    #[test]
    fn search_key_alone_ignores_model_key() {
        let mut config = AppConfig::default();
        config.search.api_key_env = "RW_TEST_SEARCH_KEY_PRESENT_55120".into();
        config.model.api_key_env = "RW_TEST_NONEXISTENT_MODEL_KEY_55120".into();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("RW_TEST_SEARCH_KEY_PRESENT_55120", "serp-key") };

        assert_eq!(resolve_search_key(&config).unwrap(), "serp-key");
        let err = resolve_api_keys(&config).unwrap_err();
        assert!(err.to_string().contains("RW_TEST_NONEXISTENT_MODEL_KEY_55120"));
    }

    #[test]
    fn blank_search_key_is_config_error() {
        let mut config = AppConfig::default();
        config.search.api_key_env = "RW_TEST_BLANK_SEARCH_KEY_55121".into();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("RW_TEST_BLANK_SEARCH_KEY_55121", "   ") };

        let err = resolve_search_key(&config).unwrap_err();
        assert!(matches!(err, RefWriterError::Config { .. }));
        assert!(err.to_string().contains("RW_TEST_BLANK_SEARCH_KEY_55121"));
    }

    #[test]
    fn api_keys_debug_is_redacted() {
        let keys = ApiKeys {
            search: "secret-a".into(),
            model: "secret-b".into(),
        };
        let dbg = format!("{keys:?}");
        assert!(!dbg.contains("secret"));
    }
}
