use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-stable classification of a failed extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidFileType,
    FileTooLarge,
    PdfLoadFailed,
    OcrInitFailedNoText,
    NoTextFromOcr,
    NoTextExtracted,
    PageMapMismatch,
    ProcessingFailed,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::InvalidFileType => "INVALID_FILE_TYPE",
            ErrorKind::FileTooLarge => "FILE_TOO_LARGE",
            ErrorKind::PdfLoadFailed => "PDF_LOAD_FAILED",
            ErrorKind::OcrInitFailedNoText => "OCR_INIT_FAILED_NO_TEXT",
            ErrorKind::NoTextFromOcr => "NO_TEXT_FROM_OCR",
            ErrorKind::NoTextExtracted => "NO_TEXT_EXTRACTED",
            ErrorKind::PageMapMismatch => "PAGE_MAP_MISMATCH",
            ErrorKind::ProcessingFailed => "PROCESSING_FAILED",
        }
    }
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type '{mime_type}': please upload a PDF document")]
    InvalidFileType { mime_type: String },

    #[error("File is too large ({size} bytes): the maximum is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Could not open the PDF: {0}")]
    PdfLoad(String),

    #[error("OCR is unavailable and the document has no extractable text: {reason}")]
    OcrUnavailable { reason: String },

    #[error("No text found via OCR: the scanned pages appear to be blank or unreadable")]
    NoTextFromOcr,

    #[error("No text could be extracted from the document")]
    NoTextExtracted,

    /// Paragraph/page bookkeeping diverged. Always a bug, never user input.
    #[error("Page map has {entries} entries but the text has {paragraphs} paragraphs")]
    PageMapMismatch { paragraphs: usize, entries: usize },

    #[error("Processing failed: {0}")]
    Processing(String),
}

impl ExtractionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionError::InvalidFileType { .. } => ErrorKind::InvalidFileType,
            ExtractionError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            ExtractionError::PdfLoad(_) => ErrorKind::PdfLoadFailed,
            ExtractionError::OcrUnavailable { .. } => ErrorKind::OcrInitFailedNoText,
            ExtractionError::NoTextFromOcr => ErrorKind::NoTextFromOcr,
            ExtractionError::NoTextExtracted => ErrorKind::NoTextExtracted,
            ExtractionError::PageMapMismatch { .. } => ErrorKind::PageMapMismatch,
            ExtractionError::Processing(_) => ErrorKind::ProcessingFailed,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Whether retrying the same input may succeed. Everything except
    /// transient processing failures requires a different file.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ExtractionError::Processing(_))
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            message: self.to_string(),
            recoverable: self.is_recoverable(),
        }
    }
}

/// Serializable view of an [`ExtractionError`] for callers and UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
}
