//! Retry decorator for providers.
//!
//! The provider contract is one upstream call per attempt. [`WithRetry`] wraps a
//! provider and re-attempts transient failures inside the same race.
//!
//! # Retry Policy
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 100ms
//! - Max delay: 400ms
//! - Jitter: down-jitter up to 25% (multiplier in [0.75, 1.0])
//!
//! # Retryable Conditions
//!
//! - HTTP 408, 409, 429, 5xx
//! - Transport errors
//!
//! A retry is never scheduled past the race deadline, and a cancelled race
//! stops the backoff sleep immediately.

use std::time::Duration;

use lookout_core::{Provider, ProviderFailure, ProviderFut, ProviderId, Query, RaceSignal, ResultEnvelope};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting initial attempt).
    pub max_retries: u32,
    /// Initial backoff delay before first retry.
    pub initial_delay: Duration,
    /// Maximum backoff delay.
    pub max_delay: Duration,
    /// Jitter factor for down-jitter (0.25 = up to 25% reduction).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            jitter_factor: 0.25,
        }
    }
}

/// Calculate retry delay with exponential backoff and jitter.
///
/// - `backoff_step`: 0 before first retry, 1 before second, etc.
#[must_use]
pub fn calculate_retry_delay(backoff_step: u32, config: &RetryConfig) -> Duration {
    // Exponential backoff: initial_delay * 2^backoff_step
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Down-jitter: multiply by random factor in [1 - jitter_factor, 1.0]
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

/// A provider that re-attempts its inner provider on transient failures.
#[derive(Debug, Clone)]
pub struct WithRetry<P> {
    inner: P,
    config: RetryConfig,
}

impl<P: Provider> WithRetry<P> {
    pub fn new(inner: P, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn attempt_with_retry(
        &self,
        query: &Query,
        signal: &RaceSignal,
    ) -> Result<ResultEnvelope, ProviderFailure> {
        let mut retry_count = 0;

        loop {
            let failure = match self.inner.attempt(query, signal).await {
                Ok(envelope) => return Ok(envelope),
                Err(failure) => failure,
            };

            if retry_count >= self.config.max_retries || !failure.kind().is_retryable() {
                return Err(failure);
            }

            let delay = calculate_retry_delay(retry_count, &self.config);
            if delay >= signal.remaining() {
                tracing::debug!(
                    provider = %self.inner.id(),
                    delay_ms = delay.as_millis(),
                    "Skipping retry, backoff would overrun the race deadline"
                );
                return Err(failure);
            }

            retry_count += 1;
            tracing::debug!(
                provider = %self.inner.id(),
                kind = %failure.kind(),
                retry_count,
                delay_ms = delay.as_millis(),
                "Retrying provider after transient failure"
            );

            if signal.guard(tokio::time::sleep(delay)).await.is_none() {
                return Err(ProviderFailure::cancelled(self.inner.id().clone()));
            }
        }
    }
}

impl<P: Provider> Provider for WithRetry<P> {
    fn id(&self) -> &ProviderId {
        self.inner.id()
    }

    fn attempt<'a>(&'a self, query: &'a Query, signal: &'a RaceSignal) -> ProviderFut<'a> {
        Box::pin(self.attempt_with_retry(query, signal))
    }
}
