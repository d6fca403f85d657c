use async_trait::async_trait;
use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    /// Engine cannot run on this machine (binary or language data missing).
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    #[error("OCR engine failed to start: {0}")]
    Startup(String),

    #[error("OCR recognition failed: {0}")]
    Recognition(String),

    #[error("OCR call timed out after {0}s")]
    Timeout(u64),

    #[error("OCR session has been terminated")]
    Terminated,

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Whether a later attempt (e.g. on the next document) could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OcrError::Startup(_) | OcrError::Timeout(_) | OcrError::Io(_)
        )
    }
}

/// Text recognized on one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean word confidence in 0..=100.
    pub confidence: f32,
}

/// Factory for OCR worker sessions (Tesseract, a remote service, ...).
#[async_trait]
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Start a new worker session. Called at most once per document.
    async fn start(&self) -> Result<Box<dyn OcrWorker>, OcrError>;
}

/// A started OCR session. Owned by exactly one pipeline run.
#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, image: &RgbaImage) -> Result<Recognition, OcrError>;

    /// Release the session's resources.
    async fn terminate(self: Box<Self>) -> Result<(), OcrError>;
}
