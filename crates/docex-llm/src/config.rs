//! Backend selection and connection settings.

use serde::{Deserialize, Serialize};

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local Ollama server.
    #[default]
    Ollama,
    /// Groq hosted inference.
    Groq,
}

impl Provider {
    /// Model used when none is configured.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Ollama => "llama3.2",
            Self::Groq => "llama-3.1-70b-versatile",
        }
    }

    /// API base URL used when none is configured.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::Groq => "https://api.groq.com/openai/v1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Groq => "groq",
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "groq" => Ok(Self::Groq),
            other => Err(format!("unknown LLM provider: {}", other)),
        }
    }
}

/// LLM backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which provider to call.
    pub provider: Provider,

    /// Model name (provider default when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// API base URL (provider default when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key, required by hosted providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Attempts per request, including the first one.
    pub max_retries: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Ollama,
            model: None,
            base_url: None,
            api_key: None,
            request_timeout_secs: 60,
            max_retries: 3,
            temperature: 0.1,
        }
    }
}

impl LlmConfig {
    /// Effective model name.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Effective base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_per_provider() {
        let config = LlmConfig::default();
        assert_eq!(config.model(), "llama3.2");
        assert_eq!(config.base_url(), "http://localhost:11434");

        let config = LlmConfig {
            provider: Provider::Groq,
            base_url: Some("https://proxy.local/v1/".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(config.model(), "llama-3.1-70b-versatile");
        assert_eq!(config.base_url(), "https://proxy.local/v1");
    }

    #[test]
    fn test_partial_json() {
        let config: LlmConfig = serde_json::from_str(r#"{"provider": "groq", "max_retries": 1}"#).unwrap();
        assert_eq!(config.provider, Provider::Groq);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Groq".parse::<Provider>().unwrap(), Provider::Groq);
        assert!("openai".parse::<Provider>().is_err());
    }
}
