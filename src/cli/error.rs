//! CLI error types and conversions

use crate::downloader::{BackupError, ConfigError};
use crate::fetcher::{ApiError, ErrorKind};
use crate::output::OutputError;

/// CLI errors; every variant is a fatal run
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Login or API setup failed
    #[error("api error: {0}")]
    ApiError(#[from] ApiError),

    /// The backup run could not complete
    #[error("backup error: {0}")]
    BackupError(#[from] BackupError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Invalid pipeline settings
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Hint printed after the error, when one applies
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::ApiError(e) => Some(e.kind.suggestion()),
            CliError::BackupError(BackupError::AuthenticationRejected(_)) => {
                Some(ErrorKind::AuthFailed.suggestion())
            }
            CliError::BackupError(BackupError::ShowList(e)) => Some(e.cause().suggestion()),
            _ => None,
        }
    }
}
