//! LLM backend implementations.

pub mod groq;
pub mod mock;
pub mod ollama;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{LlmError, Result};

/// Trait for LLM completion backends.
///
/// A backend turns one prompt into one raw completion. Backends are
/// shared across concurrent documents, so they must be `Send + Sync`.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Model the backend sends requests to.
    fn model(&self) -> &str;

    /// Send the prompt and return the model's raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Run `op` up to `max_attempts` times with exponential backoff (1s, 2s, 4s, ...)
/// between retryable failures.
pub(crate) async fn with_retries<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempts + 1 < max_attempts => {
                attempts += 1;
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                warn!("LLM request failed ({}), retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!("LLM request failed after {} attempt(s): {}", attempts + 1, e);
                return Err(e);
            }
        }
    }
}

/// Build the shared HTTP client.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Map a non-success HTTP status to an error.
pub(crate) async fn status_error(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        LlmError::RateLimited(body)
    } else {
        LlmError::Communication(format!("HTTP {}: {}", status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retries(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::ModelNotAvailable("llama3.2".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::ModelNotAvailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_sleep() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retries(1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Communication("connection refused".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Communication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_then_success_backs_off() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = with_retries(3, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(LlmError::RateLimited("slow down".to_string()))
                } else {
                    Ok("{}".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "{}");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3100), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_returns_last_error() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result: Result<()> = with_retries(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Communication("connection reset".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Communication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1100), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_success_returns_value() {
        let result = with_retries(3, || async { Ok::<_, LlmError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
