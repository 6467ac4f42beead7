//! Scripted in-process [`ShowsApi`] used by the pipeline tests

use async_trait::async_trait;
use chrono::NaiveDate;
use myshows_backup::fetcher::{ApiError, ApiResult, ApiVersion, ErrorKind, ShowsApi};
use myshows_backup::shutdown::SharedShutdown;
use myshows_backup::{ShowIdentifier, ShowListEntry, ShowMetadata, WatchedEpisode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Failure script for one call of one show: fail `times` attempts with `kind`,
/// then succeed. `u32::MAX` fails forever.
#[derive(Debug, Clone, Copy)]
struct Script {
    kind: ErrorKind,
    times: u32,
}

/// Fake backend with per-id scripted failures and attempt counters
#[derive(Default)]
pub struct FakeApi {
    shows: Vec<ShowListEntry>,
    list_failure: Option<ErrorKind>,
    metadata_scripts: HashMap<u64, Script>,
    episode_scripts: HashMap<u64, Script>,
    latency: Option<fn(u64) -> Duration>,
    stop_on_first_call: Option<SharedShutdown>,
    metadata_calls: Mutex<HashMap<u64, u32>>,
    episode_calls: Mutex<HashMap<u64, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

pub fn id(value: u64) -> ShowIdentifier {
    ShowIdentifier::new(value).unwrap()
}

pub fn entries(ids: impl IntoIterator<Item = u64>) -> Vec<ShowListEntry> {
    ids.into_iter()
        .map(|value| ShowListEntry {
            title: format!("Listed {value}"),
            watch_status: "watching".to_string(),
            ..ShowListEntry::from(id(value))
        })
        .collect()
}

impl FakeApi {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            shows: entries(ids),
            ..Self::default()
        }
    }

    /// Fail the show list call with `kind` on every attempt
    pub fn fail_list(mut self, kind: ErrorKind) -> Self {
        self.list_failure = Some(kind);
        self
    }

    /// Fail the first `times` metadata attempts for `show`
    pub fn fail_metadata(mut self, show: u64, kind: ErrorKind, times: u32) -> Self {
        self.metadata_scripts.insert(show, Script { kind, times });
        self
    }

    /// Fail every metadata attempt for `show`
    pub fn always_fail_metadata(self, show: u64, kind: ErrorKind) -> Self {
        self.fail_metadata(show, kind, u32::MAX)
    }

    /// Fail every episode attempt for `show`
    pub fn always_fail_episodes(mut self, show: u64, kind: ErrorKind) -> Self {
        self.episode_scripts.insert(
            show,
            Script {
                kind,
                times: u32::MAX,
            },
        );
        self
    }

    /// Delay every call for a show by `latency(id)`
    pub fn with_latency(mut self, latency: fn(u64) -> Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Raise `shutdown` during the first metadata call
    pub fn stop_on_first_call(mut self, shutdown: SharedShutdown) -> Self {
        self.stop_on_first_call = Some(shutdown);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn metadata_attempts(&self, show: u64) -> u32 {
        self.metadata_calls.lock().unwrap().get(&show).copied().unwrap_or(0)
    }

    pub fn episode_attempts(&self, show: u64) -> u32 {
        self.episode_calls.lock().unwrap().get(&show).copied().unwrap_or(0)
    }

    /// Shows whose metadata was requested at least once
    pub fn shows_touched(&self) -> usize {
        self.metadata_calls.lock().unwrap().len()
    }

    /// Highest number of calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call(
        &self,
        calls: &Mutex<HashMap<u64, u32>>,
        scripts: &HashMap<u64, Script>,
        show: ShowIdentifier,
    ) -> ApiResult<()> {
        let attempt = {
            let mut calls = calls.lock().unwrap();
            let count = calls.entry(show.get()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        match self.latency {
            Some(latency) => tokio::time::sleep(latency(show.get())).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match scripts.get(&show.get()) {
            Some(script) if attempt <= script.times => Err(ApiError::new(
                script.kind,
                format!("scripted {} on attempt {attempt}", script.kind),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ShowsApi for FakeApi {
    fn version(&self) -> ApiVersion {
        ApiVersion::V1
    }

    fn username(&self) -> &str {
        "tester"
    }

    async fn list_shows(&self) -> ApiResult<Vec<ShowListEntry>> {
        match self.list_failure {
            Some(kind) => Err(ApiError::new(kind, "scripted list failure")),
            None => Ok(self.shows.clone()),
        }
    }

    async fn fetch_metadata(&self, show: ShowIdentifier) -> ApiResult<ShowMetadata> {
        if let Some(shutdown) = &self.stop_on_first_call {
            shutdown.request_shutdown();
            // Let the executor observe the stop before this show completes
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        self.call(&self.metadata_calls, &self.metadata_scripts, show)
            .await?;
        Ok(ShowMetadata {
            title: format!("Show {show}"),
            title_original: format!("Original {show}"),
            year: Some(2000 + (show.get() % 20) as i32),
            show_status: "Ended".to_string(),
            total_episodes: Some(2),
            ..ShowMetadata::default()
        })
    }

    async fn fetch_episodes(&self, show: ShowIdentifier) -> ApiResult<Vec<WatchedEpisode>> {
        self.call(&self.episode_calls, &self.episode_scripts, show)
            .await?;
        Ok(vec![
            WatchedEpisode {
                id: Some(show.get() * 100 + 2),
                season: Some(1),
                number: Some(2),
                watched: NaiveDate::from_ymd_opt(2022, 1, 20),
                ..WatchedEpisode::default()
            },
            WatchedEpisode {
                id: Some(show.get() * 100 + 1),
                season: Some(1),
                number: Some(1),
                watched: NaiveDate::from_ymd_opt(2022, 1, 10),
                ..WatchedEpisode::default()
            },
        ])
    }
}
