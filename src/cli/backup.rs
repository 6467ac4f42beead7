//! Backup command implementation

use crate::auth::Credentials;
use crate::downloader::config::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
use crate::downloader::{BackupConfig, BackupExecutor, BackupOutcome, BackupReport};
use crate::fetcher::{create_api, ApiVersion};
use crate::output::{self, BackupDocument};
use crate::shutdown::SharedShutdown;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use super::CliError;

/// Parse and validate the worker count
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("workers must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "workers {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Parse a non-negative number of seconds, fractions allowed (e.g. `0.25`)
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number of seconds"))?;

    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{s}' must be a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(value))
}

/// Back up a myshows.me viewing history to JSON and CSV
#[derive(Parser, Debug)]
#[command(name = "myshows-backup", version, about, long_about = None)]
pub struct Cli {
    /// API generation: v1 (legacy REST, password login) or v2 (JSON-RPC, OAuth)
    #[arg(long, default_value = "v1")]
    pub api: ApiVersion,

    /// Output JSON path; CSV files are written next to it.
    ///
    /// Without this flag the JSON document is printed to stdout and no CSV
    /// files are written.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// myshows.me account name
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long, env = "MYSHOWS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// OAuth client id (required for --api v2)
    #[arg(long, env = "MYSHOWS_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret (required for --api v2)
    #[arg(long, env = "MYSHOWS_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Number of parallel workers (default: 5, max: 32)
    ///
    /// Every worker shares one request pacer, so raising this mostly helps
    /// when individual calls are slow rather than when the API throttles.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    pub workers: usize,

    /// Attempts per remote call, first try included (default: 3, range: 1-20)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Per-call timeout in seconds
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// Minimum delay between any two requests, in seconds
    #[arg(long, default_value = "0.1", value_parser = parse_seconds)]
    pub delay: Duration,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Pipeline configuration built from the flags
    pub fn backup_config(&self) -> BackupConfig {
        BackupConfig::default()
            .with_concurrency(self.workers)
            .with_max_retries(self.max_retries)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_request_delay(self.delay)
    }

    /// Credentials for the selected API generation.
    ///
    /// # Errors
    ///
    /// [`CliError::InvalidArgument`] when v2 is selected without both OAuth
    /// client values.
    pub fn credentials(&self) -> Result<Credentials, CliError> {
        match self.api {
            ApiVersion::V1 => Ok(Credentials::legacy(&self.username, &self.password)),
            ApiVersion::V2 => {
                let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret)
                else {
                    return Err(CliError::InvalidArgument(
                        "--api v2 requires --client-id and --client-secret".to_string(),
                    ));
                };
                Ok(Credentials::oauth(
                    client_id,
                    client_secret,
                    &self.username,
                    &self.password,
                ))
            }
        }
    }

    /// Run the backup and write its artifacts.
    ///
    /// Returns whether every show was backed up completely.
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<BackupOutcome, CliError> {
        let config = self.backup_config();
        config.validate()?;
        let credentials = self.credentials()?;

        info!(
            api_version = %self.api,
            username = %self.username,
            workers = config.concurrency,
            "Starting MyShows backup"
        );

        let api = create_api(self.api, &credentials, &config).await?;
        let username = api.username().to_string();

        let progress = create_progress_bar();
        let report = BackupExecutor::new(api, config)
            .with_shutdown(shutdown)
            .backup(Some(progress.clone()))
            .await;
        progress.finish_and_clear();
        let report = report?;

        self.write_report(&report, &username)?;
        log_failures(&report);

        Ok(report.outcome())
    }

    fn write_report(&self, report: &BackupReport, username: &str) -> Result<(), CliError> {
        match &self.output {
            Some(path) => {
                let paths = output::write_backup(report, username, self.api, path)?;
                info!(
                    json = %paths.json.display(),
                    csv = %paths.csv.display(),
                    lite_csv = %paths.lite_csv.display(),
                    "Backup written"
                );
            }
            None => {
                let document = BackupDocument::new(report, username, self.api);
                println!("{}", document.to_json_string()?);
            }
        }
        Ok(())
    }
}

fn log_failures(report: &BackupReport) {
    for failure in &report.failures {
        warn!(
            show_id = %failure.id,
            title = %failure.title,
            suggestion = failure.kind.suggestion(),
            "{failure}"
        );
    }
    for show in report.shows.iter().filter(|s| s.is_degraded()) {
        warn!(
            show_id = %show.id,
            title = %show.metadata.title,
            "Saved without episode history: {}",
            show.degraded.as_deref().unwrap_or_default()
        );
    }
}

/// Progress bar for the fetch phase; its length is set once the show list is known
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message("Backing up shows");
    pb
}
