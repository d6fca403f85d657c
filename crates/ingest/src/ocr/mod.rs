pub mod adapter;
pub mod preprocess;
pub mod tesseract;
pub mod traits;

pub use adapter::{OcrAdapter, OcrInitFailure, SessionState};
pub use preprocess::{stretch_contrast, DEFAULT_CONTRAST};
pub use tesseract::TesseractBackend;
pub use traits::{OcrBackend, OcrError, OcrWorker, Recognition};
