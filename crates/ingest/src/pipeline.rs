//! The per-document extraction loop.
//!
//! ```text
//! loading -> extracting -> (ocr)* -> chunking -> complete
//! ```
//!
//! Pages are processed strictly in order. Each run owns its own OCR
//! session, started on the first scanned page and released on every exit
//! path.

use std::sync::Arc;
use std::time::Instant;

use pdfquiz_core::config::{Config, IngestConfig};
use pdfquiz_core::{ExtractionArtifact, ExtractionError, ProgressEvent, ProgressStage};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::assemble::{assemble, AssembleOptions, PageExtraction};
use crate::chunker::{ChunkConfig, PageSource};
use crate::ocr::{OcrAdapter, OcrBackend, OcrError, TesseractBackend};
use crate::pdf::{LopdfLoader, PdfDocument, PdfError, PdfLoader};
use crate::progress::{page_percent, ProgressReporter};
use crate::text::normalize_text;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A document submitted for extraction.
#[derive(Debug, Clone)]
pub struct PdfInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl PdfInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// Reject non-PDF and oversized inputs before anything is parsed.
pub fn validate_input(input: &PdfInput, max_file_bytes: u64) -> Result<(), ExtractionError> {
    let essence = input.mime_type.split(';').next().unwrap_or_default().trim();
    if !essence.eq_ignore_ascii_case(PDF_MIME_TYPE) {
        return Err(ExtractionError::InvalidFileType {
            mime_type: input.mime_type.clone(),
        });
    }

    let size = input.bytes.len() as u64;
    if size > max_file_bytes {
        return Err(ExtractionError::FileTooLarge {
            size,
            limit: max_file_bytes,
        });
    }
    Ok(())
}

pub struct ExtractionPipeline {
    loader: Arc<dyn PdfLoader>,
    ocr_backend: Arc<dyn OcrBackend>,
    config: IngestConfig,
}

impl ExtractionPipeline {
    pub fn new(
        loader: Arc<dyn PdfLoader>,
        ocr_backend: Arc<dyn OcrBackend>,
        config: IngestConfig,
    ) -> Self {
        Self {
            loader,
            ocr_backend,
            config,
        }
    }

    /// lopdf + pdftoppm for pages, the tesseract CLI for OCR.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(LopdfLoader::from_config(&config.ocr)),
            Arc::new(TesseractBackend::from_config(&config.ocr)),
            config.ingest.clone(),
        )
    }

    pub async fn extract(&self, input: &PdfInput) -> Result<ExtractionArtifact, ExtractionError> {
        self.extract_with_progress(input, None).await
    }

    /// Run the pipeline, publishing milestones to `progress` if given.
    pub async fn extract_with_progress(
        &self,
        input: &PdfInput,
        progress: Option<UnboundedSender<ProgressEvent>>,
    ) -> Result<ExtractionArtifact, ExtractionError> {
        let started = Instant::now();
        let mut reporter = ProgressReporter::new(progress);
        validate_input(input, self.config.max_file_bytes)?;

        let ocr = OcrAdapter::new(self.ocr_backend.clone()).with_contrast(self.config.ocr_contrast);
        let result = self.run(input, &ocr, &mut reporter, started).await;

        if let Err(e) = ocr.terminate().await {
            warn!(backend = ocr.backend_name(), error = %e, "Failed to release OCR session");
        }

        match &result {
            Ok(artifact) => info!(
                file = artifact.file_name.as_deref().unwrap_or("<unnamed>"),
                pages = artifact.page_count,
                chunks = artifact.chunks.len(),
                tokens = artifact.total_tokens(),
                topics = artifact.topics.len(),
                warnings = artifact.metadata.warnings.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Extraction complete"
            ),
            Err(e) => warn!(code = e.code(), error = %e, "Extraction failed"),
        }
        result
    }

    async fn run(
        &self,
        input: &PdfInput,
        ocr: &OcrAdapter,
        reporter: &mut ProgressReporter,
        started: Instant,
    ) -> Result<ExtractionArtifact, ExtractionError> {
        reporter.report(ProgressStage::Loading, 0, "Loading PDF");
        let document = self
            .loader
            .load(&input.bytes)
            .await
            .map_err(|e| ExtractionError::PdfLoad(e.to_string()))?;
        let page_count = document.page_count();
        info!(pages = page_count, bytes = input.bytes.len(), "PDF loaded");
        reporter.loaded(page_count);

        let mut extraction = PageExtraction::default();
        for page in 1..=page_count {
            self.extract_page(document.as_ref(), page, page_count, ocr, &mut extraction, reporter)
                .await?;
            tokio::task::yield_now().await;
        }

        reporter.chunking();
        let options = AssembleOptions {
            chunk: ChunkConfig {
                max_chunk_tokens: self.config.max_chunk_tokens,
            },
            max_topics: self.config.max_topics,
        };
        let artifact = assemble(
            extraction,
            page_count,
            input.file_name.clone(),
            &options,
            started.elapsed(),
        )?;
        reporter.report(
            ProgressStage::Complete,
            100,
            format!("Extracted {} chunks", artifact.chunks.len()),
        );
        Ok(artifact)
    }

    async fn extract_page(
        &self,
        document: &dyn PdfDocument,
        page: u32,
        page_count: u32,
        ocr: &OcrAdapter,
        extraction: &mut PageExtraction,
        reporter: &mut ProgressReporter,
    ) -> Result<(), ExtractionError> {
        let percent = page_percent(page, page_count);
        reporter.report(
            ProgressStage::Extracting,
            percent,
            format!("Extracting text from page {page} of {page_count}"),
        );

        let raw = match document.page_text(page).await {
            Ok(text) => text,
            Err(e) => {
                warn!(page, error = %e, "Text layer unreadable");
                extraction.warn(format!("Could not read the text layer of page {page}: {e}"));
                String::new()
            }
        };

        let chars = raw.trim().chars().count();
        if chars > self.config.min_page_text_chars {
            debug!(page, chars, method = "digital", "Page classified");
            extraction.push_page(page, &normalize_text(&raw), PageSource::digital());
            return Ok(());
        }

        debug!(page, chars, method = "ocr", "Page classified");
        extraction.has_scanned_content = true;
        if extraction.ocr_init_failure.is_some() {
            return Ok(());
        }

        reporter.report(
            ProgressStage::Ocr,
            percent,
            format!("Running OCR on page {page} of {page_count}"),
        );
        self.ocr_page(document, page, ocr, extraction).await
    }

    async fn ocr_page(
        &self,
        document: &dyn PdfDocument,
        page: u32,
        ocr: &OcrAdapter,
        extraction: &mut PageExtraction,
    ) -> Result<(), ExtractionError> {
        extraction.ocr_attempted = true;
        if let Err(failure) = ocr.initialize().await {
            extraction.record_ocr_init_failure(failure);
            return Ok(());
        }

        let image = match document.render_page(page, self.config.render_scale).await {
            Ok(image) => image,
            Err(PdfError::Io(e)) => {
                return Err(ExtractionError::Processing(format!(
                    "rendering page {page}: {e}"
                )));
            }
            Err(e) => {
                warn!(page, error = %e, "Page render failed");
                extraction.warn(format!("Page {page} could not be rendered for OCR: {e}"));
                return Ok(());
            }
        };

        let prepared = ocr.preprocess(&image);
        match ocr.recognize(&prepared).await {
            Ok(recognition) => {
                let text = normalize_text(&recognition.text);
                if text.is_empty() {
                    debug!(page, "OCR returned no text");
                    extraction.warn(format!("No text recognized on page {page}"));
                } else {
                    debug!(page, confidence = recognition.confidence, "OCR page recognized");
                    extraction.push_page(page, &text, PageSource::ocr(recognition.confidence));
                }
                Ok(())
            }
            Err(OcrError::Io(e)) => Err(ExtractionError::Processing(format!(
                "OCR on page {page}: {e}"
            ))),
            Err(e) => {
                warn!(page, error = %e, "OCR failed");
                extraction.warn(format!("OCR failed on page {page}: {e}"));
                Ok(())
            }
        }
    }
}
