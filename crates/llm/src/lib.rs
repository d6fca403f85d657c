//! Text generation collaborator: documents are turned into prompts by the
//! caller, this crate only sends them and classifies what comes back.

pub mod provider;
pub mod providers;
pub mod retry;

pub use provider::{GenerationError, GenerationErrorKind, TextGenerator};
pub use providers::create_generator;
pub use providers::gemini::GeminiGenerator;
pub use retry::RetryingGenerator;
