//! Shared types, error model, and configuration for refwriter.
//!
//! This crate is the foundation depended on by all other refwriter crates.
//! It provides:
//! - [`RefWriterError`]: the unified error type
//! - Domain types ([`Article`], [`ArticleId`], [`ArticleUpdate`], [`ReferenceCandidate`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiKeys, AppConfig, ExtractorConfig, ModelConfig, PipelineConfig, SearchConfig,
    StorageConfig, WritePolicy, config_dir, config_file_path, init_config, load_config,
    load_config_from, resolve_api_keys, resolve_search_key,
};
pub use error::{RefWriterError, Result};
pub use types::{Article, ArticleId, ArticleUpdate, ReferenceCandidate};
