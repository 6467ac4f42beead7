//! Integration tests for the worker pool and aggregation

use crate::support::fake_api::{entries, id, FakeApi};
use myshows_backup::downloader::{
    BackupConfig, BackupError, BackupExecutor, BackupOutcome, FetchStage,
};
use myshows_backup::fetcher::ErrorKind;
use std::collections::BTreeSet;
use std::time::Duration;

pub fn fast_config(concurrency: usize) -> BackupConfig {
    BackupConfig::default()
        .with_concurrency(concurrency)
        .with_max_retries(3)
        .with_request_delay(Duration::ZERO)
        .with_backoff(Duration::from_millis(1), Duration::from_millis(5))
}

/// Completion order differs from submission order
fn scrambled_latency(show: u64) -> Duration {
    Duration::from_millis((show * 7) % 5)
}

#[tokio::test]
async fn test_one_result_per_identifier_for_any_worker_count() {
    for concurrency in [1, 3, 8, 32] {
        let api = FakeApi::new(1..=25)
            .always_fail_metadata(4, ErrorKind::BadRequest)
            .shared();
        let report = BackupExecutor::new(api, fast_config(concurrency))
            .run(entries(1..=25), None)
            .await
            .unwrap();

        assert_eq!(report.summary.requested, 25, "concurrency {concurrency}");
        assert_eq!(report.shows.len() + report.failures.len(), 25);
        assert_eq!(report.failed_ids(), vec![id(4)]);

        let ids: BTreeSet<u64> = report
            .shows
            .iter()
            .map(|s| s.id.get())
            .chain(report.failures.iter().map(|f| f.id.get()))
            .collect();
        assert_eq!(ids, (1..=25).collect());
    }
}

#[tokio::test]
async fn test_records_sorted_by_identifier() {
    let api = FakeApi::new([]).with_latency(scrambled_latency).shared();
    let report = BackupExecutor::new(api, fast_config(4))
        .run(entries([42, 7, 19, 3, 28, 11]), None)
        .await
        .unwrap();

    let ids: Vec<u64> = report.shows.iter().map(|s| s.id.get()).collect();
    assert_eq!(ids, vec![3, 7, 11, 19, 28, 42]);
}

#[tokio::test]
async fn test_same_input_gives_same_report() {
    let run = |concurrency| async move {
        let api = FakeApi::new([])
            .with_latency(scrambled_latency)
            .always_fail_metadata(5, ErrorKind::ParseError)
            .always_fail_episodes(9, ErrorKind::Timeout)
            .shared();
        BackupExecutor::new(api, fast_config(concurrency))
            .run(entries(1..=12), None)
            .await
            .unwrap()
    };

    let sequential = run(1).await;
    let parallel = run(6).await;

    assert_eq!(sequential.summary, parallel.summary);
    assert_eq!(sequential.shows, parallel.shows);
    assert_eq!(sequential.failures, parallel.failures);
}

#[tokio::test]
async fn test_failures_stay_isolated() {
    let api = FakeApi::new([])
        .always_fail_metadata(3, ErrorKind::BadRequest)
        .always_fail_metadata(7, ErrorKind::Timeout)
        .shared();
    let report = BackupExecutor::new(api.clone(), fast_config(3))
        .run(entries(1..=10), None)
        .await
        .unwrap();

    assert_eq!(report.summary.succeeded, 8);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.failed_ids(), vec![id(3), id(7)]);
    assert_eq!(report.outcome(), BackupOutcome::Partial);

    let rejected = &report.failures[0];
    assert_eq!(rejected.kind, ErrorKind::BadRequest);
    assert_eq!(rejected.stage, FetchStage::Metadata);
    assert_eq!(rejected.attempts, 1);

    let timed_out = &report.failures[1];
    assert_eq!(timed_out.kind, ErrorKind::Exhausted);
    assert_eq!(timed_out.cause, ErrorKind::Timeout);
    assert_eq!(timed_out.attempts, 3);

    // Every other show was fetched exactly once
    for show in [1, 2, 4, 5, 6, 8, 9, 10] {
        assert_eq!(api.metadata_attempts(show), 1, "show {show}");
        assert_eq!(api.episode_attempts(show), 1, "show {show}");
    }
}

#[tokio::test]
async fn test_episode_failure_degrades_record() {
    let api = FakeApi::new([])
        .always_fail_episodes(2, ErrorKind::ServerError)
        .shared();
    let report = BackupExecutor::new(api, fast_config(2))
        .run(entries(1..=3), None)
        .await
        .unwrap();

    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.degraded, 1);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.outcome(), BackupOutcome::Partial);

    let degraded = report.shows.iter().find(|s| s.id == id(2)).unwrap();
    assert!(degraded.is_degraded());
    assert!(degraded.episodes.is_empty());
    assert_eq!(degraded.metadata.title, "Show 2");

    let complete = report.shows.iter().find(|s| s.id == id(1)).unwrap();
    assert_eq!(complete.episodes.len(), 2);
    assert_eq!(complete.watched_episode_count, 2);
    assert_eq!(complete.days_watching, 10);
}

#[tokio::test]
async fn test_permanent_episode_error_fails_show() {
    let api = FakeApi::new([])
        .always_fail_episodes(2, ErrorKind::ParseError)
        .always_fail_episodes(3, ErrorKind::AuthFailed)
        .shared();
    // One worker so show 1 reaches the aggregator before the auth rejection
    let report = BackupExecutor::new(api.clone(), fast_config(1))
        .run(entries(1..=3), None)
        .await
        .unwrap();

    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.degraded, 0);
    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.failed_ids(), vec![id(2), id(3)]);
    assert!(report.shows.iter().all(|s| !s.is_degraded()));

    let malformed = &report.failures[0];
    assert_eq!(malformed.stage, FetchStage::Episodes);
    assert_eq!(malformed.kind, ErrorKind::ParseError);
    assert_eq!(malformed.attempts, 1);

    let rejected = &report.failures[1];
    assert_eq!(rejected.stage, FetchStage::Episodes);
    assert_eq!(rejected.kind, ErrorKind::AuthFailed);
    assert_eq!(rejected.attempts, 1);

    assert_eq!(api.episode_attempts(2), 1);
    assert_eq!(api.episode_attempts(3), 1);
}

#[tokio::test]
async fn test_complete_run_outcome() {
    let api = FakeApi::new([]).shared();
    let report = BackupExecutor::new(api, fast_config(5))
        .run(entries(1..=4), None)
        .await
        .unwrap();

    assert_eq!(report.outcome(), BackupOutcome::Complete);
    assert_eq!(report.summary.succeeded, 4);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_empty_list_is_fatal() {
    let api = FakeApi::new([]).shared();
    let result = BackupExecutor::new(api, fast_config(5)).run(Vec::new(), None).await;
    assert!(matches!(result, Err(BackupError::NothingToBackUp)));
}

#[tokio::test]
async fn test_duplicate_identifiers_fetched_once() {
    let api = FakeApi::new([]).shared();
    let report = BackupExecutor::new(api.clone(), fast_config(3))
        .run(entries([5, 6, 5, 7, 6]), None)
        .await
        .unwrap();

    assert_eq!(report.summary.requested, 3);
    assert_eq!(report.shows.len(), 3);
    assert_eq!(api.metadata_attempts(5), 1);
    assert_eq!(api.metadata_attempts(6), 1);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let api = FakeApi::new([]).shared();
    let result = BackupExecutor::new(api, fast_config(0))
        .run(entries(1..=3), None)
        .await;
    assert!(matches!(result, Err(BackupError::Config(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_large_run_uses_every_worker() {
    let api = FakeApi::new([]).shared();
    let report = BackupExecutor::new(api.clone(), fast_config(5))
        .run(entries(1..=750), None)
        .await
        .unwrap();

    assert_eq!(report.summary.succeeded, 750);
    assert_eq!(api.shows_touched(), 750);
    assert_eq!(report.workers.len(), 5);
    assert!(report.workers.iter().all(|w| w.claimed >= 1));
    assert_eq!(report.workers.iter().map(|w| w.claimed).sum::<usize>(), 750);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_calls_bounded_by_worker_count() {
    let api = FakeApi::new([])
        .with_latency(|_| Duration::from_millis(2))
        .shared();
    BackupExecutor::new(api.clone(), fast_config(3))
        .run(entries(1..=30), None)
        .await
        .unwrap();

    assert!(api.max_in_flight() <= 3, "saw {}", api.max_in_flight());
    assert!(api.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_backup_lists_shows_first() {
    let api = FakeApi::new(1..=6).shared();
    let report = BackupExecutor::new(api, fast_config(2))
        .backup(None)
        .await
        .unwrap();

    assert_eq!(report.summary.requested, 6);
    assert_eq!(report.shows[0].watch_status, "watching");
}

#[tokio::test]
async fn test_show_list_failure_is_fatal() {
    let api = FakeApi::new(1..=6)
        .fail_list(ErrorKind::ServerError)
        .shared();
    let result = BackupExecutor::new(api, fast_config(2)).backup(None).await;

    match result {
        Err(BackupError::ShowList(err)) => {
            assert_eq!(err.kind, ErrorKind::Exhausted);
            assert_eq!(err.attempts, 3);
        }
        other => panic!("expected show list failure, got {other:?}"),
    }
}
