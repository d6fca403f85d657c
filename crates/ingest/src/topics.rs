//! Heuristic section-heading detection used as a lightweight topic index.
//!
//! Patterns are tuned for English-language, Latin-script documents. Other
//! scripts will mostly yield no topics.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

/// Lines must be strictly shorter than this (in chars) to qualify.
const MAX_HEADING_CHARS: usize = 100;

/// Default cap on the number of topics returned.
pub const DEFAULT_MAX_TOPICS: usize = 30;

/// "INTRODUCTION TO ALGORITHMS", "Results: Part 2". No sentence punctuation.
static TITLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z0-9 ,;:\-]*$").expect("title pattern is valid"));

/// "1. Introduction", "12) Appendix".
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)] ").expect("numbered pattern is valid"));

/// "Chapter 3", "SECTION 2: Methods".
static CHAPTER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(chapter|section)\s+\d+").expect("chapter pattern is valid")
});

fn is_heading(line: &str) -> bool {
    TITLE_LINE.is_match(line) || NUMBERED_LINE.is_match(line) || CHAPTER_LINE.is_match(line)
}

/// Scan `text` line by line and return up to `max_topics` probable headings,
/// de-duplicated, in order of first appearance.
pub fn extract_topics(text: &str, max_topics: usize) -> Vec<String> {
    let mut topics: IndexSet<&str> = IndexSet::new();

    for line in text.lines() {
        if topics.len() >= max_topics {
            break;
        }
        let line = line.trim();
        let len = line.chars().count();
        if len == 0 || len >= MAX_HEADING_CHARS {
            continue;
        }
        if is_heading(line) {
            topics.insert(line);
        }
    }

    topics.into_iter().map(str::to_string).collect()
}
