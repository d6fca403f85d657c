//! Buffer bookkeeping used by the chunking strategy.

use std::collections::BTreeMap;

use pdfquiz_core::{Chunk, ExtractionMethod};

use super::types::{ChunkError, PageSource};
use crate::text::PARAGRAPH_SEPARATOR;
use crate::tokens::{estimate_tokens, tokens_for_chars};

/// Check that `page_map` has exactly one entry per paragraph.
pub fn validate_page_map(paragraphs: usize, page_map: &[u32]) -> Result<(), ChunkError> {
    if paragraphs != page_map.len() {
        return Err(ChunkError::PageMapMismatch {
            paragraphs,
            entries: page_map.len(),
        });
    }
    Ok(())
}

/// Paragraphs collected for the chunk currently being built.
pub(crate) struct ChunkBuffer<'a> {
    paragraphs: Vec<&'a str>,
    chars: usize,
    page_start: u32,
    page_end: u32,
}

impl<'a> ChunkBuffer<'a> {
    pub(crate) fn start(paragraph: &'a str, page: u32) -> Self {
        Self {
            paragraphs: vec![paragraph],
            chars: paragraph.chars().count(),
            page_start: page,
            page_end: page,
        }
    }

    /// Estimated tokens if `paragraph` were appended.
    pub(crate) fn tokens_with(&self, paragraph: &str) -> usize {
        tokens_for_chars(self.chars + PARAGRAPH_SEPARATOR.len() + paragraph.chars().count())
    }

    pub(crate) fn push(&mut self, paragraph: &'a str, page: u32) {
        self.chars += PARAGRAPH_SEPARATOR.len() + paragraph.chars().count();
        self.paragraphs.push(paragraph);
        self.page_end = self.page_end.max(page);
    }

    pub(crate) fn finish(self, index: usize, sources: &BTreeMap<u32, PageSource>) -> Chunk {
        let content = self.paragraphs.join(PARAGRAPH_SEPARATOR);
        let (method, confidence) = summarize_pages(self.page_start, self.page_end, sources);
        Chunk {
            index,
            token_count: estimate_tokens(&content),
            content,
            page_start: self.page_start,
            page_end: self.page_end,
            method,
            confidence,
        }
    }
}

/// Combined method and mean OCR confidence over the pages of one chunk.
/// Pages without an entry (e.g. blank ones skipped during extraction) do
/// not contribute.
fn summarize_pages(
    page_start: u32,
    page_end: u32,
    sources: &BTreeMap<u32, PageSource>,
) -> (ExtractionMethod, Option<f32>) {
    let mut method: Option<ExtractionMethod> = None;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0u32;

    for source in sources.range(page_start..=page_end).map(|(_, s)| s) {
        method = Some(match method {
            Some(m) => m.merge(source.method),
            None => source.method,
        });
        if let Some(c) = source.confidence {
            conf_sum += c;
            conf_count += 1;
        }
    }

    let method = method.unwrap_or(ExtractionMethod::Digital);
    let confidence = if method.involves_ocr() && conf_count > 0 {
        Some(conf_sum / conf_count as f32)
    } else {
        None
    };
    (method, confidence)
}
