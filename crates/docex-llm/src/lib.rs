//! LLM backend abstraction layer for docex.
//!
//! This crate provides a unified interface for sending a prompt to a
//! large language model and getting its raw completion back:
//! - `ollama` for locally hosted models
//! - `groq` for the hosted OpenAI-compatible API
//! - `mock` for deterministic tests

mod backend;
mod config;
mod error;

pub use backend::LlmBackend;
pub use backend::groq::GroqBackend;
pub use backend::mock::MockBackend;
pub use backend::ollama::OllamaBackend;
pub use config::{LlmConfig, Provider};
pub use error::LlmError;

use std::sync::Arc;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Build the backend selected by `config.provider`.
pub fn create_backend(config: &LlmConfig) -> Result<Arc<dyn LlmBackend>> {
    let backend: Arc<dyn LlmBackend> = match config.provider {
        Provider::Ollama => Arc::new(OllamaBackend::from_config(config)?),
        Provider::Groq => Arc::new(GroqBackend::from_config(config)?),
    };

    tracing::info!(
        "Using LLM backend {} with model {}",
        backend.name(),
        backend.model()
    );
    Ok(backend)
}
