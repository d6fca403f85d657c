//! Greedy paragraph accumulation.

use std::collections::BTreeMap;

use pdfquiz_core::Chunk;

use super::helpers::{validate_page_map, ChunkBuffer};
use super::types::{ChunkConfig, ChunkError, PageSource};
use crate::text::split_paragraphs;

/// Split normalized `text` into chunks of at most `max_chunk_tokens`.
///
/// `page_map[i]` is the 1-based page of the i-th paragraph of `text`
/// (paragraphs as returned by [`split_paragraphs`]). `sources` describes how
/// each page was extracted and drives the chunk's method and confidence.
pub fn chunk_document(
    text: &str,
    page_map: &[u32],
    sources: &BTreeMap<u32, PageSource>,
    config: &ChunkConfig,
) -> Result<Vec<Chunk>, ChunkError> {
    let paragraphs = split_paragraphs(text);
    validate_page_map(paragraphs.len(), page_map)?;

    let mut chunks = Vec::new();
    let mut buffer: Option<ChunkBuffer<'_>> = None;

    for (paragraph, &page) in paragraphs.into_iter().zip(page_map) {
        buffer = Some(match buffer.take() {
            None => ChunkBuffer::start(paragraph, page),
            Some(current) if current.tokens_with(paragraph) > config.max_chunk_tokens => {
                chunks.push(current.finish(chunks.len(), sources));
                ChunkBuffer::start(paragraph, page)
            }
            Some(mut current) => {
                current.push(paragraph, page);
                current
            }
        });
    }

    if let Some(current) = buffer {
        chunks.push(current.finish(chunks.len(), sources));
    }

    Ok(chunks)
}
