//! Retry policy for single remote calls
//!
//! Wraps one remote operation with bounded attempts. Transient failures
//! ([`ErrorKind::is_retryable`]) are retried after an increasing backoff;
//! anything else ends the loop after the attempt that produced it. Every
//! attempt, the first one included, waits for a slot from the shared
//! [`RequestPacer`].

use crate::downloader::config::{calculate_backoff, BackupConfig};
use crate::downloader::rate_limit::RequestPacer;
use crate::fetcher::{ApiError, ApiResult, ErrorKind};
use crate::metrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Why the retry policy gave up
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} after {attempts} attempt(s): {last}")]
pub struct RetryError {
    /// [`ErrorKind::Exhausted`] or [`ErrorKind::NonRetryable`]
    pub kind: ErrorKind,
    /// Error returned by the final attempt
    pub last: ApiError,
    /// Attempts made
    pub attempts: u32,
}

impl RetryError {
    /// Classification of the final attempt's failure
    pub fn cause(&self) -> ErrorKind {
        self.last.kind
    }
}

/// Bounded retry with backoff and shared request pacing
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    pacer: Arc<RequestPacer>,
}

impl RetryPolicy {
    /// Build a policy with its own pacer from `config`.
    pub fn new(config: &BackupConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            pacer: Arc::new(RequestPacer::new(config.inter_request_delay)),
        }
    }

    /// Share an existing pacer (one per run, across all workers).
    pub fn with_pacer(mut self, pacer: Arc<RequestPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Attempts per call, first try included
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    ///
    /// `label` names the call in log output (e.g. `"metadata"`).
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NonRetryable`] right after the first non-transient
    /// failure, [`ErrorKind::Exhausted`] after exactly `max_attempts`
    /// transient failures.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.pacer.acquire().await;

            let error = match operation().await {
                Ok(value) => {
                    metrics::record_attempt(label, None);
                    if attempt > 1 {
                        debug!(operation = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };
            metrics::record_attempt(label, Some(error.kind));

            if !error.is_retryable() {
                debug!(operation = label, attempt, error = %error, "Non-retryable failure");
                return Err(RetryError {
                    kind: ErrorKind::NonRetryable,
                    last: error,
                    attempts: attempt,
                });
            }

            if attempt >= self.max_attempts {
                warn!(
                    operation = label,
                    attempts = attempt,
                    error = %error,
                    suggestion = error.kind.suggestion(),
                    "Retries exhausted"
                );
                metrics::record_exhausted(label, error.kind);
                return Err(RetryError {
                    kind: ErrorKind::Exhausted,
                    last: error,
                    attempts: attempt,
                });
            }

            let backoff = calculate_backoff(attempt, self.initial_backoff, self.max_backoff);
            warn!(
                operation = label,
                attempt,
                max_attempts = self.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "{}, retrying",
                error.kind.description()
            );
            metrics::record_retry_backoff(label, error.kind, backoff);
            tokio::time::sleep(backoff).await;
        }
    }
}
