//! Result aggregation
//!
//! Results arrive in completion order. Successes are keyed by identifier and
//! failures by submission index, so the final [`BackupReport`] is the same
//! for any arrival order.

use crate::downloader::item::{FetchFailure, FetchResult};
use crate::identifier::ShowIdentifier;
use crate::ShowRecord;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::warn;

/// Counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSummary {
    /// Identifiers submitted
    pub requested: usize,
    /// Complete records
    pub succeeded: usize,
    /// Records without their episode list
    pub degraded: usize,
    /// Shows with no record
    pub failed: usize,
}

/// How a run ended, for exit-status purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupOutcome {
    /// Every show produced a complete record
    Complete,
    /// Some shows failed or are degraded
    Partial,
}

/// Per-worker claim statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Worker index
    pub worker: usize,
    /// Shows this worker claimed and fetched
    pub claimed: usize,
}

/// Final snapshot handed to the output sink
#[derive(Debug, Clone, PartialEq)]
pub struct BackupReport {
    /// Counts
    pub summary: BackupSummary,
    /// Records (full and degraded) sorted by identifier
    pub shows: Vec<ShowRecord>,
    /// Failures in submission order
    pub failures: Vec<FetchFailure>,
    /// Wall-clock duration of the fetch phase
    pub elapsed: Duration,
    /// Claim counts per worker (empty when built by [`collect`])
    pub workers: Vec<WorkerStats>,
}

impl BackupReport {
    /// Whether the run was complete or partial
    pub fn outcome(&self) -> BackupOutcome {
        if self.summary.failed == 0 && self.summary.degraded == 0 {
            BackupOutcome::Complete
        } else {
            BackupOutcome::Partial
        }
    }

    /// Identifiers of failed shows, in submission order
    pub fn failed_ids(&self) -> Vec<ShowIdentifier> {
        self.failures.iter().map(|f| f.id).collect()
    }
}

/// Single-consumer accumulator for [`FetchResult`]s
#[derive(Debug, Default)]
pub struct Aggregator {
    shows: BTreeMap<ShowIdentifier, ShowRecord>,
    failures: BTreeMap<usize, FetchFailure>,
    seen: BTreeMap<usize, ShowIdentifier>,
    ids: BTreeSet<ShowIdentifier>,
}

impl Aggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result for the identifier submitted at `index`.
    ///
    /// Returns `false` (and keeps the first result) if `index` or the
    /// identifier was already recorded, whether as a record or a failure.
    pub fn insert(&mut self, index: usize, result: FetchResult) -> bool {
        let id = result.id();
        if self.seen.contains_key(&index) {
            warn!(show_id = %id, index, "Duplicate result for submission slot ignored");
            return false;
        }
        if !self.ids.insert(id) {
            warn!(show_id = %id, index, "Second result for show ignored");
            return false;
        }

        match result {
            FetchResult::Success(record) => {
                self.shows.insert(id, record);
            }
            FetchResult::Failure(failure) => {
                self.failures.insert(index, failure);
            }
        }

        self.seen.insert(index, id);
        true
    }

    /// Whether a result for submission `index` was recorded
    pub fn contains_index(&self, index: usize) -> bool {
        self.seen.contains_key(&index)
    }

    /// Results recorded so far, one per distinct identifier
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Build the final report.
    pub fn finish(self, requested: usize, elapsed: Duration, workers: Vec<WorkerStats>) -> BackupReport {
        let degraded = self.shows.values().filter(|r| r.is_degraded()).count();
        let summary = BackupSummary {
            requested,
            succeeded: self.shows.len() - degraded,
            degraded,
            failed: self.failures.len(),
        };

        BackupReport {
            summary,
            shows: self.shows.into_values().collect(),
            failures: self.failures.into_values().collect(),
            elapsed,
            workers,
        }
    }
}

/// Consume a stream of results into a report.
///
/// Stream position is taken as the submission index for failure ordering.
pub async fn collect<S>(results: S) -> BackupReport
where
    S: Stream<Item = FetchResult>,
{
    let started = std::time::Instant::now();
    let mut aggregator = Aggregator::new();

    let mut results = std::pin::pin!(results.enumerate());
    while let Some((index, result)) = results.next().await {
        aggregator.insert(index, result);
    }

    let requested = aggregator.len();
    aggregator.finish(requested, started.elapsed(), Vec::new())
}
