//! Worker pool orchestrator
//!
//! A fixed number of workers pull shows from a shared queue, fetch them
//! through [`ShowFetcher`], and push every result over one channel to the
//! single aggregation point running in the caller's task. Workers never
//! touch the output collection.

use crate::downloader::aggregator::{Aggregator, BackupReport, WorkerStats};
use crate::downloader::item::{FetchFailure, FetchResult, ShowFetcher};
use crate::downloader::progress::ProgressState;
use crate::downloader::rate_limit::RequestPacer;
use crate::downloader::retry::RetryPolicy;
use crate::downloader::{BackupConfig, BackupError};
use crate::fetcher::{ErrorKind, SharedApi};
use crate::shutdown::{self, ScopedShutdown, SharedShutdown};
use crate::ShowListEntry;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Barrier};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Shared work queue with claim-one-item semantics.
///
/// The cursor only moves forward, so no index is handed out twice and
/// everything at or past [`WorkQueue::claimed`] was never handed out.
#[derive(Debug)]
struct WorkQueue {
    items: Vec<ShowListEntry>,
    cursor: AtomicUsize,
}

impl WorkQueue {
    fn new(items: Vec<ShowListEntry>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    fn claim(&self) -> Option<(usize, &ShowListEntry)> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.items.get(index).map(|entry| (index, entry))
    }

    fn claimed(&self) -> usize {
        self.cursor.load(Ordering::SeqCst).min(self.items.len())
    }
}

/// Runs a backup across a bounded pool of workers
pub struct BackupExecutor {
    api: SharedApi,
    config: BackupConfig,
    shutdown: Option<SharedShutdown>,
}

impl BackupExecutor {
    /// Create an executor over `api`.
    ///
    /// Picks up the global shutdown handle if one was registered.
    pub fn new(api: SharedApi, config: BackupConfig) -> Self {
        Self {
            api,
            config,
            shutdown: shutdown::get_global_shutdown(),
        }
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Configuration the executor runs with
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Fetch the user's show list, then back up every show on it.
    ///
    /// The list call is the first remote call of the run: an authentication
    /// rejection here is fatal.
    pub async fn backup(&self, progress: Option<ProgressBar>) -> Result<BackupReport, BackupError> {
        self.config.validate()?;

        let retry = RetryPolicy::new(&self.config);
        let entries = retry
            .execute("list_shows", || self.api.list_shows())
            .await
            .map_err(|err| match err.cause() {
                ErrorKind::AuthFailed => BackupError::AuthenticationRejected(err.last.message),
                _ => BackupError::ShowList(err),
            })?;

        info!(count = entries.len(), username = self.api.username(), "Fetched show list");
        self.run(entries, progress).await
    }

    /// Back up `entries` and return the aggregated report.
    ///
    /// Exactly one result is recorded per distinct identifier. Duplicate
    /// identifiers are dropped (first occurrence kept) before queueing.
    ///
    /// # Errors
    ///
    /// - [`BackupError::Config`] for an invalid configuration
    /// - [`BackupError::NothingToBackUp`] for an empty list
    /// - [`BackupError::AuthenticationRejected`] when the first result is an
    ///   authentication failure
    /// - [`BackupError::Interrupted`] when a stop left every show unfetched
    pub async fn run(
        &self,
        entries: Vec<ShowListEntry>,
        progress: Option<ProgressBar>,
    ) -> Result<BackupReport, BackupError> {
        self.config.validate()?;

        let entries = dedupe(entries);
        if entries.is_empty() {
            return Err(BackupError::NothingToBackUp);
        }

        let span = info_span!(
            "backup_run",
            total = entries.len(),
            concurrency = self.config.concurrency,
            api_version = %self.api.version()
        );
        self.run_pool(entries, progress).instrument(span).await
    }

    async fn run_pool(
        &self,
        entries: Vec<ShowListEntry>,
        progress: Option<ProgressBar>,
    ) -> Result<BackupReport, BackupError> {
        let total = entries.len();
        let concurrency = self.config.concurrency;
        let started = Instant::now();
        info!("Starting backup");

        // Raised by the external handle or by a fatal auth failure
        let scope = ScopedShutdown::new(self.shutdown.as_ref());
        let stop = scope.handle().clone();

        let pacer = Arc::new(RequestPacer::new(self.config.inter_request_delay));
        let fetcher = ShowFetcher::new(
            self.api.clone(),
            RetryPolicy::new(&self.config).with_pacer(pacer),
        );
        let queue = Arc::new(WorkQueue::new(entries));
        let barrier = Arc::new(Barrier::new(concurrency));
        let (tx, mut rx) = mpsc::channel(concurrency * 2);

        let handles: Vec<_> = (0..concurrency)
            .map(|worker| {
                tokio::spawn(
                    run_worker(
                        worker,
                        queue.clone(),
                        fetcher.clone(),
                        barrier.clone(),
                        stop.clone(),
                        tx.clone(),
                    )
                    .in_current_span(),
                )
            })
            .collect();
        drop(tx);

        let mut aggregator = Aggregator::new();
        let mut progress = ProgressState::new(total, progress);
        let mut auth_rejected = None;

        while let Some((index, result)) = rx.recv().await {
            if aggregator.is_empty() {
                if let FetchResult::Failure(failure) = &result {
                    if failure.kind == ErrorKind::AuthFailed {
                        error!(show_id = %failure.id, "First request was rejected as unauthorized; stopping");
                        stop.request_shutdown();
                        auth_rejected = Some(failure.message.clone());
                    }
                }
            }
            progress.record(&result);
            aggregator.insert(index, result);
        }

        let mut workers = Vec::with_capacity(concurrency);
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(stats) => workers.push(stats),
                Err(e) => {
                    error!(worker, error = %e, "Worker terminated abnormally");
                    workers.push(WorkerStats { worker, claimed: 0 });
                }
            }
        }
        drop(scope);

        // Every identifier gets exactly one result, including those no worker reported
        let claimed = queue.claimed();
        let mut cancelled = 0;
        for (index, entry) in queue.items.iter().enumerate() {
            if aggregator.contains_index(index) {
                continue;
            }
            let failure = if index >= claimed {
                cancelled += 1;
                FetchFailure::cancelled(entry)
            } else {
                FetchFailure::lost(entry)
            };
            aggregator.insert(index, FetchResult::Failure(failure));
        }
        if cancelled > 0 {
            warn!(cancelled, "Stop requested; remaining shows were not fetched");
        }

        let report = aggregator.finish(total, started.elapsed(), workers);
        progress.finish(&report.summary);

        if let Some(message) = auth_rejected {
            return Err(BackupError::AuthenticationRejected(message));
        }
        if cancelled == total {
            return Err(BackupError::Interrupted);
        }

        info!(
            succeeded = report.summary.succeeded,
            degraded = report.summary.degraded,
            failed = report.summary.failed,
            "Backup complete"
        );
        Ok(report)
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<WorkQueue>,
    fetcher: ShowFetcher,
    barrier: Arc<Barrier>,
    stop: SharedShutdown,
    results: mpsc::Sender<(usize, FetchResult)>,
) -> WorkerStats {
    // Each worker holds its first claim before anyone may take a second one
    let mut next = if stop.is_shutdown_requested() {
        None
    } else {
        queue.claim()
    };
    barrier.wait().await;

    let mut claimed = 0;
    while let Some((index, entry)) = next {
        let result = fetcher.fetch(entry).await;
        claimed += 1;

        if results.send((index, result)).await.is_err() {
            warn!(worker, "Result channel closed; worker exiting");
            break;
        }
        if stop.is_shutdown_requested() {
            debug!(worker, "Stop requested; exiting after current show");
            break;
        }
        next = queue.claim();
    }

    debug!(worker, claimed, "Worker finished");
    WorkerStats { worker, claimed }
}

fn dedupe(entries: Vec<ShowListEntry>) -> Vec<ShowListEntry> {
    let before = entries.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<_> = entries
        .into_iter()
        .filter(|entry| seen.insert(entry.id))
        .collect();

    if unique.len() < before {
        warn!(
            duplicates = before - unique.len(),
            "Dropped duplicate show identifiers from the show list"
        );
    }
    unique
}
