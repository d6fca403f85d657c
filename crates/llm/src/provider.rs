use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for text generation backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send a single prompt and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(prompt).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("server error: {status} - {body}")]
    Server { status: u16, body: String },
    #[error("request rejected: {status} - {body}")]
    InvalidRequest { status: u16, body: String },
    #[error("content blocked: {0}")]
    ContentBlocked(String),
    #[error("failed to parse response: {0}")]
    MalformedResponse(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    Auth,
    RateLimited,
    Server,
    InvalidRequest,
    ContentBlocked,
    MalformedResponse,
    Network,
    NotConfigured,
}

impl GenerationError {
    /// Map a non-success HTTP status to an error class.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => GenerationError::Auth(body),
            400 if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
                GenerationError::Auth(body)
            }
            429 => GenerationError::RateLimited(body),
            500..=599 => GenerationError::Server { status, body },
            _ => GenerationError::InvalidRequest { status, body },
        }
    }

    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            GenerationError::Auth(_) => GenerationErrorKind::Auth,
            GenerationError::RateLimited(_) => GenerationErrorKind::RateLimited,
            GenerationError::Server { .. } => GenerationErrorKind::Server,
            GenerationError::InvalidRequest { .. } => GenerationErrorKind::InvalidRequest,
            GenerationError::ContentBlocked(_) => GenerationErrorKind::ContentBlocked,
            GenerationError::MalformedResponse(_) => GenerationErrorKind::MalformedResponse,
            GenerationError::Network(_) => GenerationErrorKind::Network,
            GenerationError::NotConfigured(_) => GenerationErrorKind::NotConfigured,
        }
    }

    /// Rate limits, 5xx and transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            GenerationErrorKind::RateLimited
                | GenerationErrorKind::Server
                | GenerationErrorKind::Network
        )
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            GenerationErrorKind::Auth => {
                "The AI service rejected the API key. Check that GEMINI_API_KEY is valid."
            }
            GenerationErrorKind::RateLimited => {
                "The AI service is receiving too many requests. Please wait a moment and try again."
            }
            GenerationErrorKind::Server => {
                "The AI service is temporarily unavailable. Please try again shortly."
            }
            GenerationErrorKind::InvalidRequest => "The AI service rejected the request.",
            GenerationErrorKind::ContentBlocked => {
                "The AI service declined to answer because of its content safety filters."
            }
            GenerationErrorKind::MalformedResponse => {
                "The AI service returned a response that could not be understood. Please try again."
            }
            GenerationErrorKind::Network => {
                "Could not reach the AI service. Check your network connection."
            }
            GenerationErrorKind::NotConfigured => {
                "No AI provider is configured. Set GEMINI_API_KEY to enable generation."
            }
        }
    }
}
