//! Bounded retry with exponential back-off and jitter for provider calls.
//!
//! Every attempt runs under a per-attempt timeout. Only errors for which
//! [`Error::is_retriable`] holds are repeated; rejections come back at once.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nr_core::config::RetryConfig;
use nr_core::{EmbeddingProvider, Error, Prompt, Result, TextGenerator};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
    /// Budget for a single attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(retry: &RetryConfig, timeout: Duration) -> Self {
        Self {
            max_retries: retry.max_retries,
            backoff_base: retry.backoff_base,
            max_backoff: retry.max_backoff,
            timeout,
        }
    }

    /// Sleep before retry number `attempt` (1-based), with ±25 % jitter.
    fn delay(&self, attempt: u32) -> Duration {
        let computed = self
            .backoff_base
            .saturating_mul(1u32 << (attempt.saturating_sub(1)).min(10));
        let capped = computed.min(self.max_backoff);
        capped.mul_f64(rand::random::<f64>() * 0.5 + 0.75)
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    provider: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(Error::ProviderTimeout {
                provider: provider.to_string(),
                after: policy.timeout,
            }),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= policy.max_retries {
                    if attempt > 0 {
                        tracing::warn!(provider, attempts = attempt + 1, error = %err, "Provider call failed, giving up");
                    }
                    return Err(err);
                }
                attempt += 1;
                let delay = policy.delay(attempt);
                tracing::warn!(
                    provider,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient provider error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// [`TextGenerator`] decorator applying a [`RetryPolicy`].
pub struct RetryingGenerator {
    inner: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl fmt::Debug for RetryingGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingGenerator")
            .field("inner", &self.inner)
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for RetryingGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        retry_with_backoff(&self.policy, self.inner.name(), || self.inner.generate(prompt)).await
    }
}

/// [`EmbeddingProvider`] decorator applying a [`RetryPolicy`].
pub struct RetryingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl fmt::Debug for RetryingEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingEmbedder")
            .field("inner", &self.inner)
            .field("policy", &self.policy)
            .finish()
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        retry_with_backoff(&self.policy, self.inner.name(), || self.inner.embed(texts)).await
    }
}
