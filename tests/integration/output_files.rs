//! Integration tests for writing a finished backup to disk

use crate::integration::backup_pipeline::fast_config;
use crate::support::fake_api::{entries, FakeApi};
use myshows_backup::downloader::BackupExecutor;
use myshows_backup::fetcher::{ApiVersion, ErrorKind};
use myshows_backup::output::{write_backup, BackupPaths};
use serde_json::Value;
use tempfile::TempDir;

#[tokio::test]
async fn test_write_backup_creates_all_artifacts() {
    let api = FakeApi::new([])
        .always_fail_metadata(2, ErrorKind::BadRequest)
        .always_fail_episodes(3, ErrorKind::Timeout)
        .shared();
    let report = BackupExecutor::new(api, fast_config(2))
        .run(entries(1..=4), None)
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let json_path = dir.path().join("nested").join("backup.json");
    let paths = write_backup(&report, "tester", ApiVersion::V1, &json_path).unwrap();

    assert_eq!(paths, BackupPaths::from_json_path(&json_path));
    assert!(paths.csv.ends_with("backup.csv"));
    assert!(paths.lite_csv.ends_with("backup_lite.csv"));

    let document: Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.json).unwrap()).unwrap();
    let metadata = &document["metadata"];
    assert_eq!(metadata["username"], "tester");
    assert_eq!(metadata["api_version"], "v1");
    assert_eq!(metadata["total_shows"], 3);
    assert_eq!(metadata["succeeded"], 2);
    assert_eq!(metadata["degraded"], 1);
    assert_eq!(metadata["failed"], 1);

    let ids: Vec<u64> = document["shows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3, 4]);
    assert_eq!(document["failures"][0]["id"], 2);
    assert_eq!(document["failures"][0]["kind"], "bad_request");

    let mut full = csv::Reader::from_path(&paths.csv).unwrap();
    assert_eq!(&full.headers().unwrap()[1], "show_id");
    assert_eq!(full.records().count(), 3);

    let mut lite = csv::Reader::from_path(&paths.lite_csv).unwrap();
    let headers: Vec<String> = lite.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        headers,
        vec!["title_original", "title_ru", "year", "my_rating", "status"]
    );
    let first = lite.records().next().unwrap().unwrap();
    assert_eq!(&first[0], "Original 1");
    // No Russian title in the fake metadata: falls back to the title
    assert_eq!(&first[1], "Show 1");
}
