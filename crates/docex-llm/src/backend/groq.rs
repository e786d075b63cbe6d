//! Groq backend using the OpenAI-compatible chat completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{LlmBackend, http_client, status_error, with_retries};
use crate::{LlmConfig, LlmError, Result};

/// Backend for Groq hosted models.
pub struct GroqBackend {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl GroqBackend {
    /// Create a backend from configuration. Fails without an API key.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey("groq".to_string()))?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
            client: http_client(config.request_timeout_secs)?,
        })
    }

    async fn chat_once(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))
    }
}

#[async_trait]
impl LlmBackend for GroqBackend {
    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Sending {} chars to Groq model {}", prompt.len(), self.model);
        with_retries(self.max_retries, || self.chat_once(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provider;

    #[test]
    fn test_blank_api_key_rejected() {
        let config = LlmConfig {
            provider: Provider::Groq,
            api_key: Some("   ".to_string()),
            ..LlmConfig::default()
        };
        assert!(matches!(
            GroqBackend::from_config(&config),
            Err(LlmError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "llama-3.1-70b-versatile",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.1,
            response_format: ResponseFormat { kind: "json_object" },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
