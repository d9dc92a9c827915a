//! Core orchestration for refwriter.
//!
//! This crate ties reference discovery, page extraction and the rewrite
//! model together into the per-article batch pipeline ([`Pipeline::run_batch`]).

pub mod gemini;
pub mod pipeline;
pub mod rewrite;

pub use gemini::GeminiModel;
pub use pipeline::{
    ArticleOutcome, BatchReport, Pipeline, ProgressReporter, REFERENCES_PER_ARTICLE,
    RunSettings, SilentProgress, SkipReason, Stage, format_final_content,
};
pub use rewrite::{RewriteEngine, TextModel, build_rewrite_prompt};
