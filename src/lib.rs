//! # MyShows Backup Library
//!
//! Exports a user's complete TV-show viewing history from the myshows.me API
//! into durable local artifacts: a hierarchical JSON document and flattened
//! CSV tables.
//!
//! ## Features
//!
//! - **Two API backends**: legacy REST (v1) and OAuth JSON-RPC (v2), selected once at startup
//! - **Bounded concurrency**: a fixed pool of workers pulls shows from a shared queue
//! - **Retry with backoff**: transient failures are retried, permanent ones fail fast
//! - **Graceful degradation**: one broken show never aborts the whole run
//! - **Deterministic output**: shows are ordered by id regardless of completion order
//!
//! ## Quick Start
//!
//! ```no_run
//! use myshows_backup::auth::Credentials;
//! use myshows_backup::downloader::{BackupConfig, BackupExecutor};
//! use myshows_backup::fetcher::{create_api, ApiVersion};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BackupConfig::default();
//! let credentials = Credentials::legacy("alice", "secret");
//! let api = create_api(ApiVersion::V1, &credentials, &config).await?;
//!
//! let shows = api.list_shows().await?;
//! let report = BackupExecutor::new(api, config).run(shows, None).await?;
//! println!("{} shows backed up", report.summary.succeeded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identifier`] - Show identifier parsing and validation
//! - [`auth`] - Credential exchange producing an immutable [`auth::Session`]
//! - [`fetcher`] - HTTP client adapter and the v1/v2 API backends
//! - [`downloader`] - Retry policy, item fetcher, worker pool and aggregator
//! - [`output`] - JSON and CSV writers for the final report
//! - [`metrics`] - Attempt, retry, pacing and per-show counters
//! - [`shutdown`] - Global stop signal shared by all workers

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Credential exchange and session context
pub mod auth;

/// CLI command implementations
pub mod cli;

/// Fetch pipeline: retry, workers and aggregation
pub mod downloader;

/// Remote API access
pub mod fetcher;

/// Show identifier parsing and validation
pub mod identifier;

/// Pipeline metrics emitted through the `metrics` facade
pub mod metrics;

/// Backup output writers
pub mod output;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use identifier::ShowIdentifier;

/// One entry of the user's show list, as returned by the identifier source.
///
/// Carries the user-specific fields (watch status, personal rating) that the
/// per-show endpoints do not return.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShowListEntry {
    /// Show identifier
    pub id: ShowIdentifier,
    /// Title as shown in the list (may be empty)
    pub title: String,
    /// User's list status (e.g. "watching", "completed")
    pub watch_status: String,
    /// User's own rating of the show
    pub my_rating: Option<f64>,
    /// Watched episode count reported by the list endpoint
    pub watched_episodes: Option<u32>,
}

impl From<ShowIdentifier> for ShowListEntry {
    fn from(id: ShowIdentifier) -> Self {
        Self {
            id,
            title: String::new(),
            watch_status: String::new(),
            my_rating: None,
            watched_episodes: None,
        }
    }
}

/// Episode facts known from the show catalog (season/number/title).
///
/// The legacy API returns watched episodes as bare ids and keeps these
/// details on the show metadata instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogEpisode {
    /// Season number
    pub season: Option<u32>,
    /// Episode number within the season
    pub number: Option<u32>,
    /// Episode title
    pub title: Option<String>,
    /// Air date as reported by the API
    pub air_date: Option<String>,
}

/// Show-level metadata from the per-show endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShowMetadata {
    /// Localized title
    pub title: String,
    /// Original-language title
    pub title_original: String,
    /// Russian title
    pub ru_title: String,
    /// Premiere year
    pub year: Option<i32>,
    /// Production status (e.g. "Returning Series")
    pub show_status: String,
    /// Site-wide rating
    pub rating: Option<f64>,
    /// IMDb identifier
    pub imdb_id: Option<String>,
    /// IMDb rating
    pub imdb_rating: Option<f64>,
    /// Kinopoisk identifier
    pub kinopoisk_id: Option<String>,
    /// Kinopoisk rating
    pub kinopoisk_rating: Option<f64>,
    /// Country of origin
    pub country: String,
    /// Broadcasting network
    pub network: String,
    /// Genre names
    pub genres: Vec<String>,
    /// Total aired episodes
    pub total_episodes: Option<u32>,
    /// Total seasons
    pub total_seasons: Option<u32>,
    /// Episode runtime in minutes
    pub runtime: Option<u32>,
    /// Poster URL
    pub image: String,
    /// Synopsis
    pub description: String,
    /// First air date
    pub started: String,
    /// Last air date
    pub ended: String,
    /// Episode catalog keyed by episode id (legacy API only)
    #[serde(skip)]
    pub episode_catalog: BTreeMap<u64, CatalogEpisode>,
}

/// One entry from the per-show episode/watch-history endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WatchedEpisode {
    /// Episode id
    pub id: Option<u64>,
    /// Episode title, if the endpoint includes it
    pub title: Option<String>,
    /// Season number, if the endpoint includes it
    pub season: Option<u32>,
    /// Episode number, if the endpoint includes it
    pub number: Option<u32>,
    /// Air date
    pub air_date: Option<String>,
    /// Date the user watched the episode
    pub watched: Option<NaiveDate>,
    /// User's episode rating
    pub rating: Option<f64>,
}

/// Normalized episode inside a [`ShowRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeRecord {
    /// Episode id
    pub id: Option<u64>,
    /// Episode title
    pub title: String,
    /// Season number
    pub season: Option<u32>,
    /// Episode number within the season
    pub number: Option<u32>,
    /// Air date
    pub air_date: Option<String>,
    /// Watch date; `None` when unwatched
    pub watched: Option<NaiveDate>,
    /// User's episode rating
    pub rating: Option<f64>,
}

impl EpisodeRecord {
    /// Build an episode record, filling gaps from the show catalog.
    pub fn from_watched(episode: WatchedEpisode, catalog: &BTreeMap<u64, CatalogEpisode>) -> Self {
        let known = episode.id.and_then(|id| catalog.get(&id));

        Self {
            id: episode.id,
            title: episode
                .title
                .or_else(|| known.and_then(|c| c.title.clone()))
                .unwrap_or_default(),
            season: episode.season.or_else(|| known.and_then(|c| c.season)),
            number: episode.number.or_else(|| known.and_then(|c| c.number)),
            air_date: episode
                .air_date
                .or_else(|| known.and_then(|c| c.air_date.clone())),
            watched: episode.watched,
            rating: episode.rating,
        }
    }
}

/// Aggregated per-show record: metadata, episodes and derived watch statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShowRecord {
    /// Show identifier
    pub id: ShowIdentifier,
    /// Show-level metadata
    #[serde(flatten)]
    pub metadata: ShowMetadata,
    /// User's list status
    pub watch_status: String,
    /// User's own rating
    pub my_rating: Option<f64>,
    /// Watched episode count reported by the show list
    pub listed_watched_episodes: Option<u32>,
    /// Episodes ordered by watch date (unwatched last), then season and number
    pub episodes: Vec<EpisodeRecord>,
    /// Earliest watch date
    pub first_watched: Option<NaiveDate>,
    /// Latest watch date
    pub last_watched: Option<NaiveDate>,
    /// Days between first and last watched episode
    pub days_watching: i64,
    /// Number of episodes with a watch date
    pub watched_episode_count: u32,
    /// Set when the episode list could not be fetched; carries the reason
    pub degraded: Option<String>,
}

impl ShowRecord {
    /// Merge list entry, metadata and watch history into a complete record.
    pub fn assemble(
        entry: &ShowListEntry,
        metadata: ShowMetadata,
        watched: Vec<WatchedEpisode>,
    ) -> Self {
        let mut episodes: Vec<EpisodeRecord> = watched
            .into_iter()
            .map(|e| EpisodeRecord::from_watched(e, &metadata.episode_catalog))
            .collect();
        sort_episodes(&mut episodes);

        let mut record = Self::base(entry, metadata);
        record.episodes = episodes;
        record.refresh_watch_stats();
        record
    }

    /// Build a record whose episode list could not be retrieved.
    pub fn degraded(entry: &ShowListEntry, metadata: ShowMetadata, reason: impl Into<String>) -> Self {
        let mut record = Self::base(entry, metadata);
        record.degraded = Some(reason.into());
        record
    }

    fn base(entry: &ShowListEntry, mut metadata: ShowMetadata) -> Self {
        if metadata.title.is_empty() && !entry.title.is_empty() {
            metadata.title = entry.title.clone();
        }

        Self {
            id: entry.id,
            metadata,
            watch_status: entry.watch_status.clone(),
            my_rating: entry.my_rating,
            listed_watched_episodes: entry.watched_episodes,
            episodes: Vec::new(),
            first_watched: None,
            last_watched: None,
            days_watching: 0,
            watched_episode_count: 0,
            degraded: None,
        }
    }

    fn refresh_watch_stats(&mut self) {
        let dates: Vec<NaiveDate> = self.episodes.iter().filter_map(|e| e.watched).collect();

        self.first_watched = dates.iter().min().copied();
        self.last_watched = dates.iter().max().copied();
        self.days_watching = match (self.first_watched, self.last_watched) {
            (Some(first), Some(last)) => (last - first).num_days(),
            _ => 0,
        };
        self.watched_episode_count = dates.len() as u32;
    }

    /// Whether the record was produced without its episode list.
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Validate record integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.is_degraded() && !self.episodes.is_empty() {
            return Err(format!(
                "Degraded show {} must not carry episodes, got {}",
                self.id,
                self.episodes.len()
            ));
        }

        let watched = self.episodes.iter().filter(|e| e.watched.is_some()).count() as u32;
        if watched != self.watched_episode_count {
            return Err(format!(
                "Watched count ({}) does not match episodes with a watch date ({})",
                self.watched_episode_count, watched
            ));
        }

        if let (Some(first), Some(last)) = (self.first_watched, self.last_watched) {
            if last < first {
                return Err(format!(
                    "Last watched ({last}) must not precede first watched ({first})"
                ));
            }
        }

        if self.days_watching < 0 {
            return Err(format!(
                "Days watching must be non-negative, got {}",
                self.days_watching
            ));
        }

        Ok(())
    }
}

fn sort_episodes(episodes: &mut [EpisodeRecord]) {
    episodes.sort_by(|a, b| {
        let by_date = match (a.watched, b.watched) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_date
            .then_with(|| a.season.cmp(&b.season))
            .then_with(|| a.number.cmp(&b.number))
    });
}
