pub mod gemini;

use pdfquiz_core::config::LlmConfig;

use crate::provider::{GenerationError, TextGenerator};

/// Create the configured generation provider.
pub fn create_generator(config: &LlmConfig) -> Result<Box<dyn TextGenerator>, GenerationError> {
    match config.provider.as_str() {
        "gemini" => {
            let api_key = config
                .gemini_api_key
                .as_ref()
                .ok_or_else(|| GenerationError::NotConfigured("GEMINI_API_KEY not set".into()))?;
            Ok(Box::new(
                gemini::GeminiGenerator::new(api_key.clone(), config.gemini_model.clone())
                    .with_generation_config(config.temperature, config.max_tokens),
            ))
        }
        other => Err(GenerationError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}
