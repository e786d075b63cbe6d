//! Ollama backend using the `/api/generate` endpoint in JSON mode.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmBackend, http_client, status_error, with_retries};
use crate::{LlmConfig, LlmError, Result};

/// Backend for a local Ollama server.
pub struct OllamaBackend {
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaBackend {
    /// Create a backend for the given server and model.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.1,
            max_retries: 3,
            client: http_client(60)?,
        })
    }

    /// Create a backend from configuration.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: http_client(config.request_timeout_secs)?,
        })
    }

    /// Set the number of attempts per request.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn generate_once(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {}", e)))?;

        Ok(body.response)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Sending {} chars to Ollama model {}", prompt.len(), self.model);
        with_retries(self.max_retries, || self.generate_once(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let backend = OllamaBackend::new("http://localhost:11434/", "mistral").unwrap();
        assert_eq!(backend.base_url, "http://localhost:11434");
        assert_eq!(backend.model(), "mistral");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", "llama3.2")
            .unwrap()
            .with_max_retries(1);

        let result = backend.complete("hello").await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
