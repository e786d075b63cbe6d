//! Structured extraction through an LLM backend.

use std::sync::Arc;

use async_trait::async_trait;
use docex_llm::LlmBackend;
use tracing::debug;

use super::parser::parse_response;
use super::prompt::build_prompt;
use crate::error::{DocexError, Result};
use crate::models::document::StructuredExtraction;

/// Turns the raw text of one chunk into a structured extraction.
#[async_trait]
pub trait StructuredExtractionClient: Send + Sync {
    /// Extract structured fields from `text`.
    async fn extract(&self, text: &str) -> Result<StructuredExtraction>;
}

/// Client that prompts an LLM backend and parses its JSON answer.
pub struct LlmExtractionClient {
    backend: Arc<dyn LlmBackend>,
}

impl LlmExtractionClient {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn LlmBackend {
        self.backend.as_ref()
    }
}

#[async_trait]
impl StructuredExtractionClient for LlmExtractionClient {
    async fn extract(&self, text: &str) -> Result<StructuredExtraction> {
        let prompt = build_prompt(text);
        let raw = self
            .backend
            .complete(&prompt)
            .await
            .map_err(|e| DocexError::StructuredExtractionFailed(e.to_string()))?;

        debug!(
            "{} returned {} chars for a {} char chunk",
            self.backend.name(),
            raw.len(),
            text.len()
        );
        parse_response(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use docex_llm::MockBackend;

    #[tokio::test]
    async fn test_extract_through_mock_backend() {
        let backend = MockBackend::new(
            r#"{"document_type": "driver_license", "expiry_date": "2025-12-31", "confidence": 0.9}"#,
        );
        let client = LlmExtractionClient::new(Arc::new(backend.clone()));

        let result = client.extract("License expires 12/2025").await.unwrap();
        assert_eq!(result.document_type, "driver_license");
        assert_eq!(result.expiry_date, NaiveDate::from_ymd_opt(2025, 12, 31));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_backend_error_is_structured_extraction_failure() {
        let client = LlmExtractionClient::new(Arc::new(MockBackend::failing("connection refused")));

        let result = client.extract("anything").await;
        match result {
            Err(DocexError::StructuredExtractionFailed(msg)) => {
                assert!(msg.contains("connection refused"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
