//! PDF ingestion: page-by-page text extraction with OCR fallback,
//! paragraph-aligned chunking with page provenance, and a heuristic
//! topic index.
//!
//! ```text
//! PdfInput -> validate -> load -> per page: text layer | render + OCR
//!          -> normalize -> topics + chunks -> ExtractionArtifact
//! ```

pub mod assemble;
pub mod chunker;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod progress;
pub mod text;
pub mod tokens;
pub mod topics;

pub use chunker::{chunk_document, ChunkConfig, ChunkError, PageSource};
pub use ocr::{OcrAdapter, OcrBackend, OcrError, OcrWorker, Recognition, TesseractBackend};
pub use pdf::{LopdfLoader, PdfDocument, PdfError, PdfLoader};
pub use pipeline::{validate_input, ExtractionPipeline, PdfInput};
pub use tokens::estimate_tokens;
pub use topics::extract_topics;
