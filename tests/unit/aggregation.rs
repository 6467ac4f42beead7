//! Unit tests for order-independent aggregation

use futures::stream;
use myshows_backup::downloader::{collect, FetchFailure, FetchResult};
use myshows_backup::{ShowIdentifier, ShowListEntry, ShowMetadata, ShowRecord};

fn entry(id: u64) -> ShowListEntry {
    ShowListEntry::from(ShowIdentifier::new(id).unwrap())
}

fn results() -> Vec<FetchResult> {
    (1..=9)
        .map(|id| {
            if id % 4 == 0 {
                FetchResult::Failure(FetchFailure::cancelled(&entry(id)))
            } else if id == 5 {
                FetchResult::Success(ShowRecord::degraded(
                    &entry(id),
                    ShowMetadata::default(),
                    "episodes unavailable",
                ))
            } else {
                FetchResult::Success(ShowRecord::assemble(
                    &entry(id),
                    ShowMetadata::default(),
                    Vec::new(),
                ))
            }
        })
        .collect()
}

#[tokio::test]
async fn test_arrival_order_does_not_change_records() {
    let in_order = collect(stream::iter(results())).await;

    let mut reversed_results = results();
    reversed_results.reverse();
    let reversed = collect(stream::iter(reversed_results)).await;

    // Rotating by three keeps id 4 ahead of id 8
    let mut rotated_results = results();
    rotated_results.rotate_left(3);
    let rotated = collect(stream::iter(rotated_results)).await;

    assert_eq!(in_order.shows, reversed.shows);
    assert_eq!(in_order.shows, rotated.shows);
    assert_eq!(in_order.summary, reversed.summary);
    assert_eq!(in_order.failures, rotated.failures);

    assert_eq!(in_order.summary.requested, 9);
    assert_eq!(in_order.summary.succeeded, 6);
    assert_eq!(in_order.summary.degraded, 1);
    assert_eq!(in_order.summary.failed, 2);
}

#[tokio::test]
async fn test_duplicate_success_kept_once() {
    let results = vec![
        FetchResult::Success(ShowRecord::assemble(&entry(1), ShowMetadata::default(), Vec::new())),
        FetchResult::Success(ShowRecord::degraded(&entry(1), ShowMetadata::default(), "late")),
    ];
    let report = collect(stream::iter(results)).await;

    assert_eq!(report.shows.len(), 1);
    assert!(!report.shows[0].is_degraded());
}

#[tokio::test]
async fn test_success_and_failure_for_same_show_counted_once() {
    let results = vec![
        FetchResult::Failure(FetchFailure::cancelled(&entry(3))),
        FetchResult::Success(ShowRecord::assemble(&entry(3), ShowMetadata::default(), Vec::new())),
        FetchResult::Success(ShowRecord::assemble(&entry(4), ShowMetadata::default(), Vec::new())),
    ];
    let report = collect(stream::iter(results)).await;

    assert_eq!(report.summary.requested, 2);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.failed_ids(), vec![ShowIdentifier::new(3).unwrap()]);
    let shows: Vec<u64> = report.shows.iter().map(|r| r.id.get()).collect();
    assert_eq!(shows, vec![4]);
}
