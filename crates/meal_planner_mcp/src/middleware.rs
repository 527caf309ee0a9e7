//! Timing, logging and metrics around the generation capability.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use gemini_client::config::Config;
use gemini_client::http_client::ReqwestGeminiClient;
use gemini_client::retry::{RetryPolicy, RetryingGenerationClient};
use gemini_client::{GeminiError, GenerationClient, ImageOptions};
use tracing::{debug, info};

pub const GENERATION_REQUESTS_TOTAL: &str = "meal_planner_generation_requests_total";
pub const GENERATION_DURATION_SECONDS: &str = "meal_planner_generation_duration_seconds";

/// Wraps any [`GenerationClient`] and records each call.
#[derive(Clone)]
pub struct InstrumentedClient {
    inner: Arc<dyn GenerationClient>,
}

impl InstrumentedClient {
    pub fn new(inner: Arc<dyn GenerationClient>) -> Self {
        Self { inner }
    }

    async fn observe<F, Fut, T>(&self, operation: &'static str, f: F) -> Result<T, GeminiError>
    where
        F: FnOnce(Arc<dyn GenerationClient>) -> Fut,
        Fut: std::future::Future<Output = Result<T, GeminiError>>,
    {
        let start = Instant::now();
        debug!("Starting generation call: {}", operation);

        let result = f(self.inner.clone()).await;

        let elapsed = start.elapsed();
        let outcome = match &result {
            Ok(_) => {
                debug!("Generation call succeeded: {} in {:?}", operation, elapsed);
                "ok"
            }
            Err(e) => {
                debug!(
                    "Generation call failed: {} in {:?} - error: {}",
                    operation, elapsed, e
                );
                "error"
            }
        };
        metrics::counter!(GENERATION_REQUESTS_TOTAL, "operation" => operation, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(GENERATION_DURATION_SECONDS, "operation" => operation)
            .record(elapsed.as_secs_f64());

        result
    }
}

#[async_trait]
impl GenerationClient for InstrumentedClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        self.observe("generate_text", |client| async move {
            client.generate_text(prompt).await
        })
        .await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<Option<Vec<u8>>, GeminiError> {
        self.observe("generate_image", |client| async move {
            client.generate_image(prompt, options).await
        })
        .await
    }
}

/// Stand-in used when no API key is configured: every call fails, so plan
/// generation always lands on the fallback plan.
#[derive(Clone, Debug, Default)]
pub struct UnconfiguredClient;

#[async_trait]
impl GenerationClient for UnconfiguredClient {
    async fn generate_text(&self, _prompt: &str) -> Result<String, GeminiError> {
        Err(GeminiError::Config("GEMINI_API_KEY missing".into()))
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _options: &ImageOptions,
    ) -> Result<Option<Vec<u8>>, GeminiError> {
        Err(GeminiError::Config("GEMINI_API_KEY missing".into()))
    }
}

/// Full client stack for the binaries: Gemini (or [`UnconfiguredClient`]),
/// optional retries, then instrumentation.
pub fn generation_client(config: Option<&Config>) -> Result<Arc<dyn GenerationClient>, GeminiError> {
    let base: Arc<dyn GenerationClient> = match config {
        Some(cfg) => {
            let client: Arc<dyn GenerationClient> = Arc::new(ReqwestGeminiClient::from_config(cfg)?);
            if cfg.max_retries > 0 {
                info!(max_retries = cfg.max_retries, "generation retries enabled");
                Arc::new(RetryingGenerationClient::new(
                    client,
                    RetryPolicy {
                        max_retries: cfg.max_retries,
                        ..RetryPolicy::default()
                    },
                ))
            } else {
                client
            }
        }
        None => Arc::new(UnconfiguredClient),
    };
    Ok(Arc::new(InstrumentedClient::new(base)))
}
