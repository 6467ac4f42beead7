//! Backup output writers
//!
//! The output sink consumes a finished [`BackupReport`]: a pretty-printed
//! JSON document plus two flattened CSV tables derived from the same path.

use crate::downloader::BackupReport;
use crate::fetcher::ApiVersion;
use crate::ShowRecord;
use std::path::Path;
use tracing::info;

pub mod csv;
pub mod json;
pub mod path;

pub use self::csv::{CsvLiteWriter, CsvShowsWriter};
pub use self::json::{BackupDocument, BackupMetadata};
pub use self::path::BackupPaths;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Writer producing one row per show
pub trait ShowsWriter: OutputWriter {
    /// Write a single show
    fn write_show(&mut self, show: &ShowRecord) -> OutputResult<()>;

    /// Write multiple shows at once
    fn write_shows(&mut self, shows: &[ShowRecord]) -> OutputResult<()> {
        for show in shows {
            self.write_show(show)?;
        }
        Ok(())
    }
}

/// Write the JSON document and both CSV tables next to `json_path`.
///
/// Returns the paths that were written.
pub fn write_backup(
    report: &BackupReport,
    username: &str,
    api_version: ApiVersion,
    json_path: &Path,
) -> OutputResult<BackupPaths> {
    let paths = BackupPaths::from_json_path(json_path);
    let document = BackupDocument::new(report, username, api_version);

    json::write_json(&document, &paths.json)?;
    info!(path = %paths.json.display(), "JSON data saved");

    let mut full = CsvShowsWriter::new(&paths.csv, username)?;
    full.write_shows(&report.shows)?;
    full.close()?;
    info!(path = %paths.csv.display(), "CSV data saved");

    let mut lite = CsvLiteWriter::new(&paths.lite_csv)?;
    lite.write_shows(&report.shows)?;
    lite.close()?;
    info!(path = %paths.lite_csv.display(), "Lite CSV data saved");

    Ok(paths)
}

/// Create the parent directory of `path` if it is missing.
pub(crate) fn ensure_parent(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
    }
    Ok(())
}
