//! Backup configuration and backoff calculation

use std::time::Duration;

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound on concurrent workers; more only earns 429s from the API.
pub const MAX_CONCURRENCY: usize = 32;

/// Default attempts per remote call (first try included).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Upper bound on attempts per remote call.
pub const MAX_RETRIES_LIMIT: u32 = 20;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default spacing between successive remote calls across all workers.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(100);

/// Wait before the first retry.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Ceiling no single backoff wait may exceed.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Emit a progress log line every N processed shows.
pub const PROGRESS_LOG_INTERVAL: usize = 10;

/// Backoff before retry number `retry` (1-based).
///
/// Doubles from `initial` while the doubled value stays below `max`, then
/// closes half of the remaining gap per retry. Waits therefore strictly
/// increase and never exceed `max` (given `initial < max`).
pub fn calculate_backoff(retry: u32, initial: Duration, max: Duration) -> Duration {
    let mut delay = initial.min(max);
    for _ in 1..retry {
        let doubled = delay.saturating_mul(2);
        delay = if doubled < max {
            doubled
        } else {
            delay + (max - delay) / 2
        };
    }
    delay
}

/// Invalid [`BackupConfig`] values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Concurrency outside `1..=MAX_CONCURRENCY`
    #[error("concurrency must be between 1 and {MAX_CONCURRENCY}, got {0}")]
    InvalidConcurrency(usize),

    /// Attempt count outside `1..=MAX_RETRIES_LIMIT`
    #[error("max retries must be between 1 and {MAX_RETRIES_LIMIT}, got {0}")]
    InvalidMaxRetries(u32),

    /// Zero per-call timeout
    #[error("per-call timeout must be greater than zero")]
    ZeroTimeout,

    /// Backoff ceiling not above the initial wait
    #[error("max backoff ({max:?}) must be greater than initial backoff ({initial:?})")]
    InvalidBackoff {
        /// Initial wait
        initial: Duration,
        /// Ceiling
        max: Duration,
    },
}

/// Values the backup pipeline runs with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Number of concurrent workers
    pub concurrency: usize,
    /// Attempts per remote call, first try included
    pub max_retries: u32,
    /// Timeout applied to every remote call
    pub per_call_timeout: Duration,
    /// Minimum spacing between successive remote calls
    pub inter_request_delay: Duration,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Ceiling for any single retry wait
    pub max_backoff: Duration,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            per_call_timeout: DEFAULT_TIMEOUT,
            inter_request_delay: DEFAULT_REQUEST_DELAY,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }
}

impl BackupConfig {
    /// Set the worker count
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the attempt count per remote call
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }

    /// Set the spacing between remote calls
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    /// Set the backoff range
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if !(1..=MAX_RETRIES_LIMIT).contains(&self.max_retries) {
            return Err(ConfigError::InvalidMaxRetries(self.max_retries));
        }
        if self.per_call_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.initial_backoff >= self.max_backoff {
            return Err(ConfigError::InvalidBackoff {
                initial: self.initial_backoff,
                max: self.max_backoff,
            });
        }
        Ok(())
    }
}
