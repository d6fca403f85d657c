//! PDF access behind a trait seam: page count, per-page text layer, and
//! page rendering for OCR.

pub mod lopdf_source;

pub use lopdf_source::LopdfLoader;

use async_trait::async_trait;
use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("Text extraction failed on page {page}: {message}")]
    Text { page: u32, message: String },

    #[error("Rendering page {page} failed: {message}")]
    Render { page: u32, message: String },

    #[error("Renderer timed out after {0}s")]
    Timeout(u64),

    #[error("Image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens a PDF from raw bytes.
#[async_trait]
pub trait PdfLoader: Send + Sync {
    async fn load(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, PdfError>;
}

/// A loaded document. Pages are numbered from 1.
#[async_trait]
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> u32;

    /// The page's embedded text layer (may be empty for scanned pages).
    async fn page_text(&self, page: u32) -> Result<String, PdfError>;

    /// Rasterize a page at `scale` times its natural size (72 DPI).
    async fn render_page(&self, page: u32, scale: f32) -> Result<RgbaImage, PdfError>;
}
