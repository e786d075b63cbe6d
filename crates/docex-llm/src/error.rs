//! Error types for the LLM layer.

use thiserror::Error;

/// Errors that can occur while talking to an LLM backend.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error.
    #[error("communication error: {0}")]
    Communication(String),

    /// The backend answered with something we could not read.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The backend rejected the request with HTTP 429.
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// The requested model is not served by the backend.
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// The provider needs an API key and none was configured.
    #[error("missing API key for provider {0}")]
    MissingApiKey(String),

    /// Invalid backend configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether a new attempt may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Communication(_) | Self::RateLimited(_))
    }
}
