//! CLI command implementations

pub mod backup;
pub mod error;

pub use backup::Cli;
pub use error::CliError;

use crate::downloader::BackupOutcome;

/// Exit status: every show backed up completely
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status: the run could not produce a report
pub const EXIT_FATAL: i32 = 1;

/// Exit status: a report was written but some shows failed or are degraded
pub const EXIT_PARTIAL: i32 = 2;

/// Map a finished run onto the process exit status
pub fn exit_status(result: &Result<BackupOutcome, CliError>) -> i32 {
    match result {
        Ok(BackupOutcome::Complete) => EXIT_SUCCESS,
        Ok(BackupOutcome::Partial) => EXIT_PARTIAL,
        Err(_) => EXIT_FATAL,
    }
}
