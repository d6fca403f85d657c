//! Chunk configuration, per-page provenance, and errors.

use pdfquiz_core::ExtractionMethod;
use thiserror::Error;

// ── Configuration ───────────────────────────────────────────────────────────

/// Configuration for the chunking engine.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum estimated tokens per chunk (default: 2000).
    pub max_chunk_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 2000,
        }
    }
}

// ── Page provenance ─────────────────────────────────────────────────────────

/// How one page's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSource {
    pub method: ExtractionMethod,
    /// OCR confidence (0-100) for OCR pages.
    pub confidence: Option<f32>,
}

impl PageSource {
    pub fn digital() -> Self {
        Self {
            method: ExtractionMethod::Digital,
            confidence: None,
        }
    }

    pub fn ocr(confidence: f32) -> Self {
        Self {
            method: ExtractionMethod::Ocr,
            confidence: Some(confidence),
        }
    }
}

impl Default for PageSource {
    fn default() -> Self {
        Self::digital()
    }
}

// ── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    /// The paragraph-to-page map was built against different text.
    #[error("page map has {entries} entries but the text has {paragraphs} paragraphs")]
    PageMapMismatch { paragraphs: usize, entries: usize },
}
