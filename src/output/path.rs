//! Output path derivation
//!
//! All artifacts of one backup share the JSON path's stem:
//! `backup.json` → `backup.csv` and `backup_lite.csv`.

use std::path::{Path, PathBuf};

/// Paths of every artifact of one backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    /// Hierarchical JSON document
    pub json: PathBuf,
    /// Full CSV table
    pub csv: PathBuf,
    /// Lite CSV table
    pub lite_csv: PathBuf,
}

impl BackupPaths {
    /// Derive the CSV paths from the JSON path.
    ///
    /// A path without a `.json` extension keeps its full name as the stem
    /// (`backup` → `backup.csv`, `backup_lite.csv`).
    pub fn from_json_path(json: impl Into<PathBuf>) -> Self {
        let json = json.into();
        let stem = Self::stem_path(&json);

        Self {
            csv: with_suffix(&stem, ".csv"),
            lite_csv: with_suffix(&stem, "_lite.csv"),
            json,
        }
    }

    fn stem_path(json: &Path) -> PathBuf {
        let is_json = json
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            json.with_extension("")
        } else {
            json.to_path_buf()
        }
    }
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
