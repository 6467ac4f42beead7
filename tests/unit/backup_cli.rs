//! Unit tests for CLI argument parsing

use clap::Parser;
use myshows_backup::cli::{self, Cli, CliError};
use myshows_backup::downloader::{BackupError, BackupOutcome};
use myshows_backup::fetcher::ApiVersion;
use std::time::Duration;

fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
    let mut args = vec!["myshows-backup", "--username", "alice", "--password", "secret"];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args)
}

#[test]
fn test_cli_defaults() {
    let cli = parse(&[]).unwrap();

    assert_eq!(cli.api, ApiVersion::V1);
    assert_eq!(cli.workers, 5);
    assert_eq!(cli.max_retries, 3);
    assert_eq!(cli.timeout, 15);
    assert_eq!(cli.delay, Duration::from_millis(100));
    assert!(cli.output.is_none());
    assert!(!cli.verbose);

    let config = cli.backup_config();
    assert_eq!(config.concurrency, 5);
    assert_eq!(config.per_call_timeout, Duration::from_secs(15));
    assert!(config.validate().is_ok());
}

#[test]
fn test_cli_respects_custom_values() {
    let cli = parse(&[
        "--api", "v2", "--workers", "12", "--max-retries", "7", "--timeout", "30", "--delay",
        "0.5", "-o", "out/backup.json", "-v",
    ])
    .unwrap();

    assert_eq!(cli.api, ApiVersion::V2);
    assert_eq!(cli.workers, 12);
    assert_eq!(cli.max_retries, 7);
    assert_eq!(cli.delay, Duration::from_millis(500));
    assert_eq!(cli.output.as_deref(), Some(std::path::Path::new("out/backup.json")));
    assert!(cli.verbose);
}

#[test]
fn test_cli_rejects_out_of_range_values() {
    assert!(parse(&["--workers", "0"]).is_err());
    assert!(parse(&["--workers", "33"]).is_err());
    assert!(parse(&["--max-retries", "0"]).is_err());
    assert!(parse(&["--max-retries", "21"]).is_err());
    assert!(parse(&["--delay", "-1"]).is_err());
    assert!(parse(&["--api", "v3"]).is_err());
}

#[test]
fn test_v2_requires_client_credentials() {
    let cli = parse(&["--api", "v2"]).unwrap();
    if cli.client_id.is_none() || cli.client_secret.is_none() {
        assert!(matches!(cli.credentials(), Err(CliError::InvalidArgument(_))));
    }

    let cli = parse(&["--api", "v2", "--client-id", "id", "--client-secret", "s3cret"]).unwrap();
    let credentials = cli.credentials().unwrap();
    assert_eq!(credentials.username(), "alice");
    assert!(!format!("{credentials:?}").contains("s3cret"));
}

#[test]
fn test_exit_status_mapping() {
    assert_eq!(cli::exit_status(&Ok(BackupOutcome::Complete)), cli::EXIT_SUCCESS);
    assert_eq!(cli::exit_status(&Ok(BackupOutcome::Partial)), cli::EXIT_PARTIAL);
    assert_eq!(
        cli::exit_status(&Err(CliError::BackupError(BackupError::NothingToBackUp))),
        cli::EXIT_FATAL
    );
}
