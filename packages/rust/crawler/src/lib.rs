//! Reference page fetching and content extraction.
//!
//! This crate provides:
//! - [`Extractor`]: single-attempt HTTP fetch with a bounded timeout
//! - [`extract_paragraphs`]: pure HTML → paragraph text reduction

pub mod extractor;
pub mod paragraphs;

pub use extractor::Extractor;
pub use paragraphs::{ParagraphLimits, extract_paragraphs};
