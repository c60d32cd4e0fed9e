//! Retry configuration, delay calculation, and the retrying provider decorator.
//!
//! Provides [`RetryConfig`] for controlling retry behaviour and
//! [`RetryingChatProvider`], which wraps any [`ChatProvider`] with a
//! per-call timeout and automatic retry on transient errors.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use super::traits::ChatProvider;
use crate::telemetry;
use crate::types::{ChatResponse, GenerateOptions, Message};
use crate::{Result, StanceError};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use stancelab::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200))
///     .jitter(true);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
    /// Whether to add random jitter to delays. Default: true.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`.
    /// Does NOT include jitter; see [`effective_delay()`](Self::effective_delay)
    /// for the full calculation.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting provider `retry_after` hints.
    ///
    /// A `retry_after` duration (from a `RateLimited` error) takes precedence
    /// over the calculated backoff and is never jittered. Otherwise, with
    /// jitter enabled, the backoff is scaled by a random factor in [0.5, 1.0].
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        let delay = self.delay_for_attempt(attempt);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            delay
        }
    }
}

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`StanceError::is_transient()`])
/// up to `config.max_attempts`, using exponential backoff and respecting
/// `retry_after` hints from `RateLimited` errors. Each attempt is bounded by
/// `timeout` when one is given.
///
/// Permanent errors are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    timeout: Option<Duration>,
    provider_name: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts.max(1) {
        let start = Instant::now();
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, f()).await {
                Ok(result) => result,
                Err(_) => Err(StanceError::Timeout(limit)),
            },
            None => f().await,
        };

        let status = if outcome.is_ok() { "ok" } else { "error" };
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "provider" => provider_name.to_owned(),
            "operation" => operation.to_owned(),
        )
        .record(start.elapsed().as_secs_f64());
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "provider" => provider_name.to_owned(),
            "operation" => operation.to_owned(),
            "status" => status,
        )
        .increment(1);

        match outcome {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "provider" => provider_name.to_owned(),
                        "operation" => operation.to_owned(),
                    )
                    .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        operation,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or_else(|| {
        StanceError::Configuration("retry loop ran zero attempts".into())
    }))
}

/// Decorator that wraps a [`ChatProvider`] with a per-call timeout and retry logic.
///
/// On transient errors, retries with exponential backoff up to
/// `config.max_attempts`. Respects provider `retry_after` hints from
/// `RateLimited` errors. Non-transient errors are returned immediately.
pub struct RetryingChatProvider {
    inner: Arc<dyn ChatProvider>,
    config: RetryConfig,
    timeout: Option<Duration>,
}

impl RetryingChatProvider {
    /// Wrap a chat provider with retry logic.
    pub fn new(inner: Arc<dyn ChatProvider>, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            timeout: None,
        }
    }

    /// Bound every attempt by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ChatProvider for RetryingChatProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, messages: &[Message], options: &GenerateOptions) -> Result<ChatResponse> {
        with_retry(&self.config, self.timeout, self.inner.name(), "chat", || {
            self.inner.chat(messages, options)
        })
        .await
    }
}
