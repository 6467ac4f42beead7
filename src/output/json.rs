//! JSON backup document

use super::{ensure_parent, OutputError, OutputResult};
use crate::downloader::{BackupReport, FetchFailure};
use crate::fetcher::ApiVersion;
use crate::ShowRecord;
use chrono::Local;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Header of the backup document
#[derive(Debug, Clone, Serialize)]
pub struct BackupMetadata {
    /// Account the backup belongs to
    pub username: String,
    /// Local time the document was produced (ISO 8601)
    pub backup_date: String,
    /// API generation used
    pub api_version: ApiVersion,
    /// Records in the document, full and degraded
    pub total_shows: usize,
    /// Shows submitted
    pub requested: usize,
    /// Complete records
    pub succeeded: usize,
    /// Records without their episode list
    pub degraded: usize,
    /// Shows with no record
    pub failed: usize,
    /// Fetch phase duration, rounded to 10ms
    pub processing_time_seconds: f64,
}

/// Complete backup document: `{metadata, shows, failures}`
#[derive(Debug, Serialize)]
pub struct BackupDocument<'a> {
    /// Header
    pub metadata: BackupMetadata,
    /// Records sorted by show id
    pub shows: &'a [ShowRecord],
    /// Failures in submission order
    pub failures: &'a [FetchFailure],
}

impl<'a> BackupDocument<'a> {
    /// Build the document for `report`, stamped with the current local time.
    pub fn new(report: &'a BackupReport, username: &str, api_version: ApiVersion) -> Self {
        let seconds = (report.elapsed.as_secs_f64() * 100.0).round() / 100.0;
        Self {
            metadata: BackupMetadata {
                username: username.to_string(),
                backup_date: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
                api_version,
                total_shows: report.shows.len(),
                requested: report.summary.requested,
                succeeded: report.summary.succeeded,
                degraded: report.summary.degraded,
                failed: report.summary.failed,
                processing_time_seconds: seconds,
            },
            shows: &report.shows,
            failures: &report.failures,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self) -> OutputResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OutputError::SerializationError(format!("Failed to serialize backup: {e}")))
    }
}

/// Write `document` to `path` as pretty-printed UTF-8 JSON and sync it to disk.
pub fn write_json<P: AsRef<Path>>(document: &BackupDocument<'_>, path: P) -> OutputResult<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let file = File::create(path)
        .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, document)
        .map_err(|e| OutputError::SerializationError(format!("Failed to write JSON: {e}")))?;
    writer
        .write_all(b"\n")
        .map_err(|e| OutputError::IoError(format!("Failed to write JSON: {e}")))?;

    let file = writer
        .into_inner()
        .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))?;
    file.sync_all()
        .map_err(|e| OutputError::IoError(format!("Failed to sync file: {e}")))?;

    debug!(path = %path.display(), shows = document.shows.len(), "JSON document written");
    Ok(())
}
