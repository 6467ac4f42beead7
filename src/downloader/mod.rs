//! Backup orchestration: retry, workers and aggregation
//!
//! This module is the core of the crate. It turns a list of shows into a
//! [`BackupReport`] while keeping every failure local to the show it
//! belongs to.
//!
//! # Overview
//!
//! 1. **Retry Policy**: [`retry::RetryPolicy`] wraps each remote call with bounded attempts and backoff
//! 2. **Item Fetcher**: [`item::ShowFetcher`] fetches metadata, then episodes, and merges them
//! 3. **Orchestrator**: [`executor::BackupExecutor`] runs a fixed pool of workers over a shared queue
//! 4. **Aggregator**: [`aggregator::Aggregator`] orders results by identifier into the final report
//! 5. **Pacing**: [`rate_limit::RequestPacer`] spaces calls across all workers
//!
//! # Quick Start
//!
//! ```no_run
//! use myshows_backup::downloader::{BackupConfig, BackupExecutor};
//! use myshows_backup::fetcher::SharedApi;
//!
//! # async fn example(api: SharedApi) -> Result<(), Box<dyn std::error::Error>> {
//! let config = BackupConfig::default().with_concurrency(8);
//! let report = BackupExecutor::new(api, config).backup(None).await?;
//! for failure in &report.failures {
//!     eprintln!("{failure}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-show problems never surface as errors: they become
//! [`item::FetchFailure`] entries or degraded records. [`BackupError`] is
//! reserved for run-fatal conditions.

pub mod aggregator;
pub mod config;
pub mod executor;
pub mod item;
pub mod progress;
pub mod rate_limit;
pub mod retry;

pub use aggregator::{collect, Aggregator, BackupOutcome, BackupReport, BackupSummary, WorkerStats};
pub use config::{BackupConfig, ConfigError};
pub use executor::BackupExecutor;
pub use item::{FetchFailure, FetchResult, FetchStage, ShowFetcher};
pub use rate_limit::RequestPacer;
pub use retry::{RetryError, RetryPolicy};

/// Run-fatal backup errors
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// Credentials were rejected before any show was backed up
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// The show list could not be fetched
    #[error("failed to fetch show list: {0}")]
    ShowList(#[source] RetryError),

    /// The show list was empty
    #[error("nothing to back up: the show list is empty")]
    NothingToBackUp,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A stop was requested before any show was fetched
    #[error("backup interrupted before any show was fetched")]
    Interrupted,
}
