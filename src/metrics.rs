//! Backup pipeline metrics
//!
//! Emits counters and histograms through the `metrics` facade: per-attempt
//! outcomes, rate-limited responses, retry backoff, exhausted retries, pacer
//! wait time and per-show outcomes. Nothing is recorded until the embedding
//! application installs a recorder; without one every call is a no-op.

use crate::downloader::FetchResult;
use crate::fetcher::ErrorKind;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::sync::Once;
use std::time::{Duration, Instant};
use tracing::debug;

/// Remote call attempts, labelled by operation and outcome
pub const API_ATTEMPTS: &str = "myshows_api_attempts_total";
/// HTTP 429 / RPC 429 responses
pub const RATE_LIMITED: &str = "myshows_rate_limited_total";
/// Retries scheduled after a transient failure
pub const RETRIES: &str = "myshows_retries_total";
/// Backoff slept before a retry
pub const RETRY_BACKOFF: &str = "myshows_retry_backoff_seconds";
/// Calls that spent their whole attempt budget
pub const RETRIES_EXHAUSTED: &str = "myshows_retries_exhausted_total";
/// Time spent waiting for a pacer slot
pub const PACER_WAIT: &str = "myshows_pacer_wait_seconds";
/// Shows finished, labelled succeeded / degraded / failed
pub const SHOWS: &str = "myshows_shows_total";
/// Wall-clock time to fetch one show
pub const SHOW_DURATION: &str = "myshows_show_duration_seconds";

static DESCRIBED: Once = Once::new();

/// Register metric descriptions with the installed recorder.
///
/// Idempotent; call once after installing a recorder.
pub fn describe_metrics() {
    DESCRIBED.call_once(|| {
        describe_counter!(API_ATTEMPTS, Unit::Count, "Remote call attempts by outcome");
        describe_counter!(RATE_LIMITED, Unit::Count, "Rate limit responses received");
        describe_counter!(RETRIES, Unit::Count, "Retries after a transient failure");
        describe_histogram!(RETRY_BACKOFF, Unit::Seconds, "Backoff before a retry");
        describe_counter!(
            RETRIES_EXHAUSTED,
            Unit::Count,
            "Calls that failed on every allowed attempt"
        );
        describe_histogram!(PACER_WAIT, Unit::Seconds, "Time waiting for a request slot");
        describe_counter!(SHOWS, Unit::Count, "Shows finished by outcome");
        describe_histogram!(SHOW_DURATION, Unit::Seconds, "Time to fetch one show");
        debug!("Metric descriptions registered");
    });
}

/// Record one attempt of `operation`; `error` is `None` on success.
pub fn record_attempt(operation: &str, error: Option<ErrorKind>) {
    let outcome = error.map_or_else(|| "ok".to_string(), |kind| kind.to_string());
    counter!(
        API_ATTEMPTS,
        "operation" => operation.to_string(),
        "outcome" => outcome,
    )
    .increment(1);

    if error == Some(ErrorKind::RateLimited) {
        counter!(RATE_LIMITED, "operation" => operation.to_string()).increment(1);
    }
}

/// Record a retry of `operation` after a `cause` failure and its backoff.
pub fn record_retry_backoff(operation: &str, cause: ErrorKind, backoff: Duration) {
    counter!(
        RETRIES,
        "operation" => operation.to_string(),
        "cause" => cause.to_string(),
    )
    .increment(1);

    histogram!(RETRY_BACKOFF, "operation" => operation.to_string()).record(backoff.as_secs_f64());
}

/// Record that `operation` failed on its last allowed attempt.
pub fn record_exhausted(operation: &str, cause: ErrorKind) {
    counter!(
        RETRIES_EXHAUSTED,
        "operation" => operation.to_string(),
        "cause" => cause.to_string(),
    )
    .increment(1);
}

/// Record time spent waiting for a pacer slot.
pub fn record_pacer_wait(wait: Duration) {
    histogram!(PACER_WAIT).record(wait.as_secs_f64());
}

/// Times one show and records how it ended
pub struct ShowMetrics {
    start_time: Instant,
}

impl ShowMetrics {
    /// Start timing a show
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Record the show's outcome and duration.
    pub fn record(&self, result: &FetchResult) {
        let outcome = match result {
            FetchResult::Success(record) if record.is_degraded() => "degraded",
            FetchResult::Success(_) => "succeeded",
            FetchResult::Failure(_) => "failed",
        };

        counter!(SHOWS, "outcome" => outcome).increment(1);
        histogram!(SHOW_DURATION).record(self.start_time.elapsed().as_secs_f64());
    }
}
