use async_trait::async_trait;
use rand::{RngExt, rng};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::{GeminiError, GenerationClient, ImageOptions};

/// A simple retry policy with exponential backoff and jitter.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub async fn retry_async<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.retry_async_if(f, |_| true).await
    }

    /// Like [`retry_async`](Self::retry_async) but gives up immediately when
    /// `should_retry` rejects the error.
    pub async fn retry_async_if<F, Fut, T, E, P>(&self, mut f: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    // exponential backoff with jitter
                    let max_delay = self.base_delay * (1u32 << attempt.min(16));
                    let max_ms = (max_delay.as_millis() as u64).max(1);
                    let jitter = rng().random_range(0..max_ms);
                    tokio::time::sleep(Duration::from_millis(jitter)).await;
                }
            }
        }
    }
}

/// Wraps a [`GenerationClient`] and retries transient failures.
#[derive(Clone)]
pub struct RetryingGenerationClient {
    inner: Arc<dyn GenerationClient>,
    policy: RetryPolicy,
}

impl RetryingGenerationClient {
    pub fn new(inner: Arc<dyn GenerationClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl GenerationClient for RetryingGenerationClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        self.policy
            .retry_async_if(
                || async {
                    self.inner.generate_text(prompt).await.inspect_err(|e| {
                        warn!(error = %e, "generate_text attempt failed");
                    })
                },
                GeminiError::is_transient,
            )
            .await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<Option<Vec<u8>>, GeminiError> {
        self.policy
            .retry_async_if(
                || async {
                    self.inner.generate_image(prompt, options).await.inspect_err(|e| {
                        warn!(error = %e, "generate_image attempt failed");
                    })
                },
                GeminiError::is_transient,
            )
            .await
    }
}
