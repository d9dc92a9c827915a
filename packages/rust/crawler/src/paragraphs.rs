//! Paragraph-level text extraction from HTML.

use std::sync::LazyLock;

use scraper::{Html, Selector};

static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// Limits applied while collecting paragraph text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphLimits {
    /// Keep a paragraph only if its trimmed length is strictly greater than this.
    pub min_chars: usize,
    /// Truncate the joined text to this many chars.
    pub max_chars: usize,
}

impl Default for ParagraphLimits {
    fn default() -> Self {
        Self {
            min_chars: 50,
            max_chars: 3000,
        }
    }
}

/// Collect `<p>` text in document order, dropping short paragraphs,
/// joined with a blank line and truncated to `limits.max_chars`.
pub fn extract_paragraphs(html: &str, limits: &ParagraphLimits) -> String {
    let doc = Html::parse_document(html);

    let kept: Vec<String> = doc
        .select(&PARAGRAPH)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| text.chars().count() > limits.min_chars)
        .collect();

    truncate_chars(&kept.join("\n\n"), limits.max_chars)
}

/// Keep at most `max_chars` chars, never splitting a UTF-8 sequence.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
