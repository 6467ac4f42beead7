//! CSV output writers: one row per show
//!
//! The full table carries every show-level field plus the derived watch
//! statistics; the lite table keeps only titles, year, rating and status.

use crate::ShowRecord;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::{ensure_parent, OutputError, OutputResult, OutputWriter, ShowsWriter};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// Descriptions longer than this are cut and suffixed with `...`
pub const DESCRIPTION_LIMIT: usize = 200;

/// Full CSV row
#[derive(Debug, Serialize)]
struct ShowRow<'a> {
    username: &'a str,
    show_id: u64,
    title: &'a str,
    title_original: &'a str,
    title_ru: &'a str,
    year: Option<i32>,
    my_status: &'a str,
    show_status: &'a str,
    site_rating: Option<f64>,
    my_rating: Option<f64>,
    imdb_id: Option<&'a str>,
    imdb_rating: Option<f64>,
    kinopoisk_id: Option<&'a str>,
    kinopoisk_rating: Option<f64>,
    country: &'a str,
    network: &'a str,
    genres: String,
    total_episodes: Option<u32>,
    watched_episodes: u32,
    total_seasons: Option<u32>,
    runtime: Option<u32>,
    started: &'a str,
    ended: &'a str,
    description: String,
    first_episode_watched: Option<String>,
    last_episode_watched: Option<String>,
    days_watching: i64,
}

impl<'a> ShowRow<'a> {
    fn new(username: &'a str, show: &'a ShowRecord) -> Self {
        let meta = &show.metadata;
        Self {
            username,
            show_id: show.id.get(),
            title: &meta.title,
            title_original: &meta.title_original,
            title_ru: &meta.ru_title,
            year: meta.year,
            my_status: &show.watch_status,
            show_status: &meta.show_status,
            site_rating: meta.rating,
            my_rating: show.my_rating,
            imdb_id: meta.imdb_id.as_deref(),
            imdb_rating: meta.imdb_rating,
            kinopoisk_id: meta.kinopoisk_id.as_deref(),
            kinopoisk_rating: meta.kinopoisk_rating,
            country: &meta.country,
            network: &meta.network,
            genres: meta.genres.join(", "),
            total_episodes: meta.total_episodes,
            watched_episodes: show
                .listed_watched_episodes
                .unwrap_or(show.watched_episode_count),
            total_seasons: meta.total_seasons,
            runtime: meta.runtime,
            started: &meta.started,
            ended: &meta.ended,
            description: truncate_description(&meta.description),
            first_episode_watched: show.first_watched.map(|d| d.to_string()),
            last_episode_watched: show.last_watched.map(|d| d.to_string()),
            days_watching: show.days_watching,
        }
    }
}

/// Lite CSV row
#[derive(Debug, Serialize)]
struct LiteRow<'a> {
    title_original: &'a str,
    title_ru: &'a str,
    year: Option<i32>,
    my_rating: Option<f64>,
    status: &'a str,
}

impl<'a> From<&'a ShowRecord> for LiteRow<'a> {
    fn from(show: &'a ShowRecord) -> Self {
        let meta = &show.metadata;
        let or_title = |s: &'a str| if s.is_empty() { meta.title.as_str() } else { s };
        Self {
            title_original: or_title(&meta.title_original),
            title_ru: or_title(&meta.ru_title),
            year: meta.year,
            my_rating: show.my_rating,
            status: &show.watch_status,
        }
    }
}

/// Cut `description` to [`DESCRIPTION_LIMIT`] characters, appending `...` when cut.
pub fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_LIMIT {
        let mut cut: String = description.chars().take(DESCRIPTION_LIMIT).collect();
        cut.push_str("...");
        cut
    } else {
        description.to_string()
    }
}

/// Buffered CSV file shared by both table writers
struct CsvFile {
    writer: Writer<BufWriter<File>>,
    rows_written: u64,
}

impl CsvFile {
    fn create(path: &Path) -> OutputResult<Self> {
        info!("Creating CSV writer: path={}", path.display());
        ensure_parent(path)?;

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;
        let buf_writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);

        // Headers are written by csv::Writer on the first serialize()
        Ok(Self {
            writer: Writer::from_writer(buf_writer),
            rows_written: 0,
        })
    }

    fn write<S: Serialize>(&mut self, row: S) -> OutputResult<()> {
        self.writer
            .serialize(row)
            .map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<u64> {
        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;
        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;
        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        Ok(self.rows_written)
    }
}

/// Full CSV writer
pub struct CsvShowsWriter {
    file: CsvFile,
    username: String,
}

impl CsvShowsWriter {
    /// Create a writer for `path`; every row carries `username`.
    pub fn new<P: AsRef<Path>>(path: P, username: impl Into<String>) -> OutputResult<Self> {
        Ok(Self {
            file: CsvFile::create(path.as_ref())?,
            username: username.into(),
        })
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.file.rows_written
    }
}

impl ShowsWriter for CsvShowsWriter {
    fn write_show(&mut self, show: &ShowRecord) -> OutputResult<()> {
        self.file.write(ShowRow::new(&self.username, show))
    }
}

impl OutputWriter for CsvShowsWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.file.flush()
    }

    fn close(self) -> OutputResult<()> {
        let rows = self.file.close()?;
        debug!("CSV writer closed: {} shows written", rows);
        Ok(())
    }
}

/// Lite CSV writer
pub struct CsvLiteWriter {
    file: CsvFile,
}

impl CsvLiteWriter {
    /// Create a writer for `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        Ok(Self {
            file: CsvFile::create(path.as_ref())?,
        })
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.file.rows_written
    }
}

impl ShowsWriter for CsvLiteWriter {
    fn write_show(&mut self, show: &ShowRecord) -> OutputResult<()> {
        self.file.write(LiteRow::from(show))
    }
}

impl OutputWriter for CsvLiteWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.file.flush()
    }

    fn close(self) -> OutputResult<()> {
        let rows = self.file.close()?;
        debug!("Lite CSV writer closed: {} shows written", rows);
        Ok(())
    }
}
