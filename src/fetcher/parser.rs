//! myshows.me response parser
//!
//! Stateless functions turning raw `serde_json::Value` payloads from either
//! API generation into the crate's typed records. The remote payloads are
//! loosely typed (numbers arrive as strings, empty maps arrive as `[]`,
//! missing ratings arrive as `"NA"`), so most field readers are lenient and
//! only the structural checks produce a [`ErrorKind::ParseError`](crate::fetcher::ErrorKind).

use crate::fetcher::{ApiError, ApiResult};
use crate::identifier::ShowIdentifier;
use crate::{CatalogEpisode, ShowListEntry, ShowMetadata, WatchedEpisode};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Stateless parser for myshows.me responses
pub struct ShowParser;

impl ShowParser {
    /// Parse the legacy `/profile/shows/` map into list entries.
    ///
    /// # Format
    /// `{"123": {"showId": 123, "title": "...", "watchStatus": "watching", "rating": 5, "watchedEpisodes": 10}, ...}`
    ///
    /// Entries without a usable `showId` are skipped with a warning.
    pub fn parse_legacy_show_list(value: &Value) -> ApiResult<Vec<ShowListEntry>> {
        let items = Self::values_of(value, "show list")?;
        let mut entries = Vec::with_capacity(items.len());

        for item in items {
            let id = match item.get("showId").map(ShowIdentifier::from_json) {
                Some(Ok(id)) => id,
                _ => {
                    warn!(entry = %item, "Skipping show list entry without a valid showId");
                    continue;
                }
            };

            entries.push(ShowListEntry {
                id,
                title: str_field(item, &["title"]),
                watch_status: str_field(item, &["watchStatus"]),
                my_rating: f64_field(item, &["rating"]),
                watched_episodes: u32_field(item, &["watchedEpisodes"]),
            });
        }

        Ok(entries)
    }

    /// Parse a `lists.Shows` result for one list status.
    ///
    /// # Format
    /// `[{"show": {"id": 123, "title": "..."}, "rating": 4, "watchedEpisodes": 3}, ...]`
    pub fn parse_rpc_show_list(value: &Value, status: &str) -> ApiResult<Vec<ShowListEntry>> {
        let items = Self::values_of(value, "lists.Shows result")?;
        let mut entries = Vec::with_capacity(items.len());

        for item in items {
            let show = item.get("show").unwrap_or(item);
            let id = show
                .get("id")
                .or_else(|| item.get("id"))
                .map(ShowIdentifier::from_json);

            let id = match id {
                Some(Ok(id)) => id,
                _ => {
                    warn!(status, entry = %item, "Skipping list entry without a valid show id");
                    continue;
                }
            };

            entries.push(ShowListEntry {
                id,
                title: str_field(show, &["title", "titleOriginal"]),
                watch_status: status.to_string(),
                my_rating: f64_field(item, &["rating", "userRating"]),
                watched_episodes: u32_field(item, &["watchedEpisodes", "watchCount"])
                    .or_else(|| u32_field(show, &["watchedEpisodes"])),
            });
        }

        Ok(entries)
    }

    /// Parse show metadata from either API generation.
    ///
    /// The legacy payload additionally carries an `episodes` map, which is
    /// kept as the episode catalog used to fill in watched-episode details.
    pub fn parse_metadata(value: &Value) -> ApiResult<ShowMetadata> {
        if !value.is_object() {
            return Err(ApiError::parse(format!(
                "show metadata is not an object: {}",
                kind_of(value)
            )));
        }
        let show = value;

        let title = str_field(show, &["title"]);
        let total_seasons = match show.get("seasons") {
            Some(Value::Array(seasons)) => Some(seasons.len() as u32),
            Some(other) => as_u32(other).or_else(|| u32_field(show, &["totalSeasons"])),
            None => u32_field(show, &["totalSeasons"]),
        };

        Ok(ShowMetadata {
            title_original: str_field(show, &["titleOriginal"]),
            ru_title: {
                let ru = str_field(show, &["ruTitle"]);
                if ru.is_empty() {
                    title.clone()
                } else {
                    ru
                }
            },
            title,
            year: i32_field(show, &["year"]),
            show_status: str_field(show, &["status"]),
            rating: f64_field(show, &["rating"]),
            imdb_id: opt_str_field(show, &["imdbId"]),
            imdb_rating: f64_field(show, &["imdbRating"]),
            kinopoisk_id: opt_str_field(show, &["kinopoiskId"]),
            kinopoisk_rating: f64_field(show, &["kinopoiskRating"]),
            country: str_field(show, &["country"]),
            network: network_field(show),
            genres: show.get("genres").map(parse_genres).unwrap_or_default(),
            total_episodes: u32_field(show, &["totalEpisodes"]),
            total_seasons,
            runtime: u32_field(show, &["runtime"]),
            image: str_field(show, &["image"]),
            description: str_field(show, &["description"]),
            started: str_field(show, &["started"]),
            ended: str_field(show, &["ended"]),
            episode_catalog: show
                .get("episodes")
                .map(parse_catalog)
                .unwrap_or_default(),
        })
    }

    /// Parse a watched-episode payload.
    ///
    /// Accepts the legacy map keyed by episode id, the RPC array, and `null`
    /// (no history yet).
    pub fn parse_episodes(value: &Value) -> ApiResult<Vec<WatchedEpisode>> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        let items = Self::values_of(value, "episode list")?;

        Ok(items
            .into_iter()
            .map(|item| {
                let id = ["id", "episodeId"]
                    .iter()
                    .find_map(|key| item.get(*key).and_then(as_u64));
                let watched = ["watchDate", "watchedAt", "watched"]
                    .iter()
                    .find_map(|key| item.get(*key).and_then(Value::as_str))
                    .and_then(|raw| {
                        let parsed = Self::parse_watch_date(raw);
                        if parsed.is_none() && !raw.trim().is_empty() {
                            debug!(raw, "Unrecognized watch date");
                        }
                        parsed
                    });

                WatchedEpisode {
                    id,
                    title: opt_str_field(item, &["title"]),
                    season: u32_field(item, &["seasonNumber", "season"]),
                    number: u32_field(item, &["episodeNumber", "episode"]),
                    air_date: opt_str_field(item, &["airDate"]),
                    watched,
                    rating: f64_field(item, &["rating"]),
                }
            })
            .collect())
    }

    /// Parse a watch date in any of the formats the API uses.
    ///
    /// Accepts RFC 3339 datetimes (`2021-03-01T20:15:00+03:00`), naive ISO
    /// datetimes, ISO dates (`2021-03-01`) and the legacy `dd.mm.yyyy`.
    pub fn parse_watch_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.contains('T') {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Some(dt.date_naive());
            }
            return NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date());
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
            .ok()
    }

    /// Values of a JSON map or elements of an array.
    ///
    /// PHP-backed endpoints encode an empty map as `[]`, so both shapes are
    /// accepted wherever a map is expected.
    fn values_of<'a>(value: &'a Value, what: &str) -> ApiResult<Vec<&'a Value>> {
        match value {
            Value::Object(map) => Ok(map.values().collect()),
            Value::Array(items) => Ok(items.iter().collect()),
            other => Err(ApiError::parse(format!(
                "{what} must be an object or array, got {}",
                kind_of(other)
            ))),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn first<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    as_u64(value).and_then(|n| u32::try_from(n).ok())
}

fn str_field(value: &Value, keys: &[&str]) -> String {
    opt_str_field(value, keys).unwrap_or_default()
}

fn opt_str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(as_string)
}

fn f64_field(value: &Value, keys: &[&str]) -> Option<f64> {
    first(value, keys).and_then(as_f64)
}

fn u32_field(value: &Value, keys: &[&str]) -> Option<u32> {
    first(value, keys).and_then(as_u32)
}

fn i32_field(value: &Value, keys: &[&str]) -> Option<i32> {
    first(value, keys)
        .and_then(as_u64)
        .and_then(|n| i32::try_from(n).ok())
}

/// `network` is a plain string in v1 and `{"title": ...}` in v2.
fn network_field(show: &Value) -> String {
    match show.get("network") {
        Some(Value::Object(network)) => network
            .get("title")
            .and_then(as_string)
            .unwrap_or_default(),
        Some(other) => as_string(other).unwrap_or_default(),
        None => String::new(),
    }
}

fn genre_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(genre) => genre
            .get("title")
            .or_else(|| genre.get("name"))
            .and_then(as_string),
        other => as_string(other),
    }
}

fn parse_genres(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(genre_name).collect(),
        Value::Object(map) => map.values().filter_map(genre_name).collect(),
        other => as_string(other).into_iter().collect(),
    }
}

fn parse_catalog(value: &Value) -> BTreeMap<u64, CatalogEpisode> {
    let catalog_entry = |key: Option<&str>, episode: &Value| -> Option<(u64, CatalogEpisode)> {
        let id = episode
            .get("id")
            .and_then(as_u64)
            .or_else(|| key.and_then(|k| k.parse().ok()))?;
        Some((
            id,
            CatalogEpisode {
                season: u32_field(episode, &["seasonNumber", "season"]),
                number: u32_field(episode, &["episodeNumber", "episode"]),
                title: opt_str_field(episode, &["title"]),
                air_date: opt_str_field(episode, &["airDate"]),
            },
        ))
    };

    match value {
        Value::Object(map) => catalog_from_map(map, catalog_entry),
        Value::Array(items) => items
            .iter()
            .filter_map(|episode| catalog_entry(None, episode))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn catalog_from_map<F>(map: &Map<String, Value>, entry: F) -> BTreeMap<u64, CatalogEpisode>
where
    F: Fn(Option<&str>, &Value) -> Option<(u64, CatalogEpisode)>,
{
    map.iter()
        .filter_map(|(key, episode)| entry(Some(key.as_str()), episode))
        .collect()
}
