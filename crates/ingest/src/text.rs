//! Paragraph splitting and whitespace normalization.
//!
//! A paragraph is a run of text between blank lines. Normalization keeps
//! line breaks inside a paragraph (topic detection is line based) and leaves
//! exactly one blank line between paragraphs, so the paragraph count of a
//! text never changes when it is normalized.

use std::sync::LazyLock;

use regex::Regex;

/// Separator inserted between paragraphs (and between pages).
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern is valid"));

/// Split `text` on blank lines. Returns trimmed, non-empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Collapse whitespace runs inside each line, drop empty lines inside a
/// paragraph, and join paragraphs with a single blank line.
pub fn normalize_text(text: &str) -> String {
    split_paragraphs(text)
        .into_iter()
        .map(normalize_paragraph)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR)
}

fn normalize_paragraph(paragraph: &str) -> String {
    paragraph
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
