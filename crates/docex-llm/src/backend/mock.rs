//! Deterministic backend for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::LlmBackend;
use crate::{LlmError, Result};

type Canned = std::result::Result<String, String>;

/// Backend that replays canned completions without any network calls.
///
/// Queued responses are returned in order; once the queue is empty every
/// call gets the default response.
#[derive(Debug, Clone)]
pub struct MockBackend {
    default_response: Canned,
    queued: Arc<Mutex<VecDeque<Canned>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockBackend {
    /// Create a backend returning `response` for every prompt.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: Ok(response.into()),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Create a backend whose every call fails with a communication error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            default_response: Err(message.into()),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a response for the next call.
    pub fn push_response(&self, response: impl Into<String>) {
        self.lock_queue().push_back(Ok(response.into()));
    }

    /// Queue a failure for the next call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock_queue().push_back(Err(message.into()));
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        *self
            .call_count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Canned>> {
        self.queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        *self
            .call_count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;

        let next = self
            .lock_queue()
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());

        next.map_err(LlmError::Communication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_response() {
        let backend = MockBackend::new("{\"document_type\": \"invoice\"}");
        assert_eq!(
            backend.complete("any prompt").await.unwrap(),
            "{\"document_type\": \"invoice\"}"
        );
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_queue_then_default() {
        let backend = MockBackend::new("default");
        backend.push_response("first");
        backend.push_error("boom");

        assert_eq!(backend.complete("a").await.unwrap(), "first");
        assert!(matches!(
            backend.complete("b").await,
            Err(LlmError::Communication(_))
        ));
        assert_eq!(backend.complete("c").await.unwrap(), "default");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = MockBackend::failing("offline");
        assert!(backend.complete("x").await.is_err());
    }
}
