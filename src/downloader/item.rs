//! Item fetcher: one show from identifier to [`ShowRecord`]
//!
//! Metadata is fetched first; if that fails there is nothing to back up and
//! the show fails. When the episode list still fails after every retry, the
//! show becomes a degraded record (empty episodes, reason recorded) instead
//! of discarding the metadata. A permanent episode-list error (malformed
//! data, rejected session) fails the show.

use crate::downloader::retry::{RetryError, RetryPolicy};
use crate::fetcher::{ErrorKind, SharedApi};
use crate::identifier::ShowIdentifier;
use crate::metrics::ShowMetrics;
use crate::{ShowListEntry, ShowRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info_span, warn, Instrument};

/// Step of the per-show pipeline where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStage {
    /// Show metadata call
    Metadata,
    /// Episode/watch-history call
    Episodes,
    /// Merging fetched data into a consistent record
    Assemble,
    /// The show was never handed to a worker, or its worker was lost
    Dispatch,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchStage::Metadata => "metadata",
            FetchStage::Episodes => "episodes",
            FetchStage::Assemble => "assemble",
            FetchStage::Dispatch => "dispatch",
        };
        write!(f, "{s}")
    }
}

/// A show that could not be backed up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    /// Show identifier
    pub id: ShowIdentifier,
    /// Title from the show list, when known
    pub title: String,
    /// Stage that failed
    pub stage: FetchStage,
    /// `Exhausted` for spent retries, `Cancelled` for never-attempted shows,
    /// otherwise the specific non-retryable kind (e.g. `AuthFailed`)
    pub kind: ErrorKind,
    /// Classification of the last underlying error
    pub cause: ErrorKind,
    /// Human-readable detail
    pub message: String,
    /// Remote attempts made for the failing stage
    pub attempts: u32,
}

impl FetchFailure {
    fn from_retry(entry: &ShowListEntry, stage: FetchStage, err: RetryError) -> Self {
        let kind = match err.kind {
            ErrorKind::Exhausted => ErrorKind::Exhausted,
            _ => err.cause(),
        };
        Self {
            id: entry.id,
            title: entry.title.clone(),
            stage,
            kind,
            cause: err.cause(),
            message: err.last.message,
            attempts: err.attempts,
        }
    }

    /// Failure for a show that was never claimed because a stop was requested.
    pub fn cancelled(entry: &ShowListEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            stage: FetchStage::Dispatch,
            kind: ErrorKind::Cancelled,
            cause: ErrorKind::Cancelled,
            message: "stop requested before the show was fetched".to_string(),
            attempts: 0,
        }
    }

    /// Failure for a claimed show whose worker ended without reporting.
    pub fn lost(entry: &ShowListEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title.clone(),
            stage: FetchStage::Dispatch,
            kind: ErrorKind::NonRetryable,
            cause: ErrorKind::NonRetryable,
            message: "worker terminated before reporting a result".to_string(),
            attempts: 0,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "show {} ({} stage): {} after {} attempt(s): {}",
            self.id,
            self.stage,
            self.kind.description(),
            self.attempts,
            self.message
        )
    }
}

/// Outcome of fetching one show; exactly one is produced per identifier
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Complete record, or a degraded one (see [`ShowRecord::is_degraded`])
    Success(ShowRecord),
    /// The show could not be backed up
    Failure(FetchFailure),
}

impl FetchResult {
    /// Identifier the result belongs to
    pub fn id(&self) -> ShowIdentifier {
        match self {
            FetchResult::Success(record) => record.id,
            FetchResult::Failure(failure) => failure.id,
        }
    }
}

/// Fetches and assembles a single show
#[derive(Clone)]
pub struct ShowFetcher {
    api: SharedApi,
    retry: RetryPolicy,
}

impl ShowFetcher {
    /// Create a fetcher over `api` using `retry` for every remote call.
    pub fn new(api: SharedApi, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Fetch metadata and episodes for `entry` and merge them.
    ///
    /// Never returns an error: every outcome is a [`FetchResult`].
    pub async fn fetch(&self, entry: &ShowListEntry) -> FetchResult {
        let span = info_span!("fetch_show", show_id = %entry.id);
        let timer = ShowMetrics::start();
        let result = self.fetch_inner(entry).instrument(span).await;
        timer.record(&result);
        result
    }

    async fn fetch_inner(&self, entry: &ShowListEntry) -> FetchResult {
        let id = entry.id;

        let metadata = match self
            .retry
            .execute("metadata", || self.api.fetch_metadata(id))
            .await
        {
            Ok(metadata) => metadata,
            Err(err) => {
                let failure = FetchFailure::from_retry(entry, FetchStage::Metadata, err);
                error!(show_id = %id, stage = %failure.stage, kind = %failure.kind, "Failed to fetch show: {}", failure.message);
                return FetchResult::Failure(failure);
            }
        };

        let record = match self
            .retry
            .execute("episodes", || self.api.fetch_episodes(id))
            .await
        {
            Ok(episodes) => {
                debug!(show_id = %id, episodes = episodes.len(), "Fetched episodes");
                ShowRecord::assemble(entry, metadata, episodes)
            }
            Err(err) if err.kind == ErrorKind::Exhausted => {
                let reason = format!("episodes: {err}");
                warn!(show_id = %id, cause = %err.cause(), attempts = err.attempts, "Episode list unavailable, keeping metadata only");
                ShowRecord::degraded(entry, metadata, reason)
            }
            // Malformed or rejected episode data fails the show
            Err(err) => {
                let failure = FetchFailure::from_retry(entry, FetchStage::Episodes, err);
                error!(show_id = %id, stage = %failure.stage, kind = %failure.kind, "Failed to fetch show: {}", failure.message);
                return FetchResult::Failure(failure);
            }
        };

        if let Err(reason) = record.validate() {
            error!(show_id = %id, "Inconsistent show record: {reason}");
            return FetchResult::Failure(FetchFailure {
                id,
                title: entry.title.clone(),
                stage: FetchStage::Assemble,
                kind: ErrorKind::ParseError,
                cause: ErrorKind::ParseError,
                message: reason,
                attempts: 1,
            });
        }

        FetchResult::Success(record)
    }
}
