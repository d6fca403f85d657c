//! Turning the accumulated page texts into an [`ExtractionArtifact`].

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use pdfquiz_core::{ExtractionArtifact, ExtractionError, ExtractionMethod, Metadata};
use uuid::Uuid;

use crate::chunker::{chunk_document, ChunkConfig, ChunkError, PageSource};
use crate::ocr::OcrInitFailure;
use crate::text::{normalize_text, split_paragraphs, PARAGRAPH_SEPARATOR};
use crate::topics::{extract_topics, DEFAULT_MAX_TOPICS};

impl From<ChunkError> for ExtractionError {
    fn from(err: ChunkError) -> Self {
        match err {
            ChunkError::PageMapMismatch { paragraphs, entries } => {
                ExtractionError::PageMapMismatch { paragraphs, entries }
            }
        }
    }
}

/// State accumulated by the page loop.
#[derive(Debug, Default)]
pub struct PageExtraction {
    /// Page texts joined by blank lines, in page order.
    pub text: String,
    /// Page number of every paragraph in `text`.
    pub page_map: Vec<u32>,
    pub sources: BTreeMap<u32, PageSource>,
    pub has_digital_text: bool,
    pub has_scanned_content: bool,
    pub ocr_attempted: bool,
    /// Set once when the OCR session fails to start.
    pub ocr_init_failure: Option<OcrInitFailure>,
    pub warnings: Vec<String>,
    ocr_confidence_sum: f32,
    ocr_pages: u32,
}

impl PageExtraction {
    /// Append one page's (normalized) text and record its paragraphs.
    /// Returns the number of paragraphs added.
    pub fn push_page(&mut self, page: u32, text: &str, source: PageSource) -> usize {
        let paragraphs = split_paragraphs(text);
        if paragraphs.is_empty() {
            self.warn(format!("No paragraphs detected on page {page}"));
            return 0;
        }

        for paragraph in &paragraphs {
            if !self.text.is_empty() {
                self.text.push_str(PARAGRAPH_SEPARATOR);
            }
            self.text.push_str(paragraph);
            self.page_map.push(page);
        }
        self.sources.insert(page, source);

        match (source.method, source.confidence) {
            (ExtractionMethod::Digital, _) => self.has_digital_text = true,
            (_, Some(confidence)) => {
                self.ocr_confidence_sum += confidence;
                self.ocr_pages += 1;
            }
            (_, None) => self.ocr_pages += 1,
        }
        paragraphs.len()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record the failed OCR start and its single warning.
    pub fn record_ocr_init_failure(&mut self, failure: OcrInitFailure) {
        let hint = if failure.recoverable {
            " (a later run may succeed)"
        } else {
            ""
        };
        self.warn(format!("OCR engine failed to initialize: {}{hint}", failure.message));
        self.ocr_init_failure = Some(failure);
    }

    /// At least one page got its text from OCR.
    pub fn ocr_succeeded(&self) -> bool {
        self.ocr_pages > 0
    }

    /// Mean confidence over OCR pages, 0 when there are none.
    pub fn mean_ocr_confidence(&self) -> f32 {
        if self.ocr_pages == 0 {
            return 0.0;
        }
        (self.ocr_confidence_sum / self.ocr_pages as f32).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub chunk: ChunkConfig,
    pub max_topics: usize,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            max_topics: DEFAULT_MAX_TOPICS,
        }
    }
}

/// Why a run produced no text at all.
pub fn classify_empty(extraction: &PageExtraction) -> ExtractionError {
    if let (Some(failure), false) = (&extraction.ocr_init_failure, extraction.has_digital_text) {
        return ExtractionError::OcrUnavailable {
            reason: failure.message.clone(),
        };
    }
    if !extraction.has_digital_text && extraction.has_scanned_content && extraction.ocr_attempted {
        return ExtractionError::NoTextFromOcr;
    }
    ExtractionError::NoTextExtracted
}

/// Normalize, validate, index and chunk the accumulated text.
pub fn assemble(
    extraction: PageExtraction,
    page_count: u32,
    file_name: Option<String>,
    options: &AssembleOptions,
    processing_time: Duration,
) -> Result<ExtractionArtifact, ExtractionError> {
    let full_text = normalize_text(&extraction.text);
    if full_text.is_empty() {
        return Err(classify_empty(&extraction));
    }

    let topics = extract_topics(&full_text, options.max_topics);
    let chunks = chunk_document(
        &full_text,
        &extraction.page_map,
        &extraction.sources,
        &options.chunk,
    )?;

    let metadata = Metadata {
        has_digital_text: extraction.has_digital_text,
        has_scanned_content: extraction.has_scanned_content,
        ocr_attempted: extraction.ocr_attempted,
        ocr_succeeded: extraction.ocr_succeeded(),
        ocr_confidence: extraction.mean_ocr_confidence(),
        processing_time,
        warnings: extraction.warnings,
    };

    Ok(ExtractionArtifact {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        file_name,
        page_count,
        chunks,
        topics,
        full_text,
        metadata,
    })
}
