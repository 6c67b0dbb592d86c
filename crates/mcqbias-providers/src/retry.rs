//! Retry decorator for transient backend failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mcqbias_core::traits::{GenerateRequest, GenerateResponse, Generator, ModelInfo};

use crate::error::ProviderError;

/// Upper bound for a single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Wraps a [`Generator`] and retries failed calls with exponential backoff.
///
/// Permanent provider errors (bad credentials, unknown model) are returned
/// immediately. A rate-limit response replaces the next delay with the
/// server's `retry-after` hint.
pub struct RetryingGenerator {
    inner: Arc<dyn Generator>,
    max_retries: u32,
    retry_delay: Duration,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn Generator>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            retry_delay,
        }
    }
}

#[async_trait]
impl Generator for RetryingGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let mut delay = self.retry_delay;
        let mut attempt = 0;

        loop {
            let err = match self.inner.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let provider_err = err.downcast_ref::<ProviderError>();
            if provider_err.is_some_and(ProviderError::is_permanent) || attempt >= self.max_retries {
                return Err(err);
            }

            let wait = provider_err
                .and_then(ProviderError::retry_after_ms)
                .map(Duration::from_millis)
                .unwrap_or(delay)
                .min(MAX_DELAY);

            attempt += 1;
            tracing::debug!(
                attempt,
                max_retries = self.max_retries,
                wait_ms = wait.as_millis() as u64,
                "retrying generation: {err:#}"
            );
            tokio::time::sleep(wait).await;
            delay = (delay * 2).min(MAX_DELAY);
        }
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        self.inner.available_models()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcqbias_core::traits::TokenUsage;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Fails with the queued errors, then succeeds.
    struct Flaky {
        errors: Mutex<Vec<ProviderError>>,
        calls: Mutex<u32>,
    }

    impl Flaky {
        fn new(mut errors: Vec<ProviderError>) -> Arc<Self> {
            errors.reverse();
            Arc::new(Self {
                errors: Mutex::new(errors),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Generator for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            *self.calls.lock().unwrap() += 1;
            if let Some(err) = self.errors.lock().unwrap().pop() {
                return Err(err.into());
            }
            Ok(GenerateResponse {
                content: "ok".into(),
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new("m", "p")
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_with_backoff() {
        let inner = Flaky::new(vec![
            ProviderError::NetworkError("reset".into()),
            ProviderError::Timeout(30),
        ]);
        let retrying = RetryingGenerator::new(inner.clone(), 3, Duration::from_millis(100));

        let start = Instant::now();
        let response = retrying.generate(&request()).await.unwrap();

        assert_eq!(response.content, "ok");
        assert_eq!(inner.calls(), 3);
        // 100ms then 200ms
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(retrying.name(), "flaky");
    }

    #[tokio::test(start_paused = true)]
    async fn honors_retry_after() {
        let inner = Flaky::new(vec![ProviderError::RateLimited {
            retry_after_ms: 5000,
        }]);
        let retrying = RetryingGenerator::new(inner.clone(), 1, Duration::from_millis(10));

        let start = Instant::now();
        retrying.generate(&request()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let inner = Flaky::new(vec![ProviderError::AuthenticationFailed("bad key".into())]);
        let retrying = RetryingGenerator::new(inner.clone(), 5, Duration::from_millis(10));

        let err = retrying.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let inner = Flaky::new(vec![
            ProviderError::NetworkError("1".into()),
            ProviderError::NetworkError("2".into()),
            ProviderError::NetworkError("3".into()),
        ]);
        let retrying = RetryingGenerator::new(inner.clone(), 2, Duration::from_millis(10));

        let err = retrying.generate(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "network error: 3");
        assert_eq!(inner.calls(), 3);
    }
}
