//! Main entry point for the myshows-backup CLI

use clap::Parser;
use myshows_backup::cli::{self, Cli};
use myshows_backup::shutdown::{self, ShutdownCoordinator};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing(verbose: bool) {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("myshows_backup={default_level}")));

    // Logs go to stderr so the JSON document can be piped from stdout
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}

#[tokio::main]
async fn main() {
    // Usage errors exit with the fatal status, help and version with success
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let status = if e.use_stderr() { cli::EXIT_FATAL } else { cli::EXIT_SUCCESS };
            std::process::exit(status);
        }
    };
    init_tracing(cli.verbose);
    myshows_backup::metrics::describe_metrics();

    // Install global shutdown coordinator and Ctrl+C handler
    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received - finishing in-flight shows...");
                shutdown.request_shutdown();
            }
        }
    });

    let result = cli.execute(shutdown).await;
    let status = cli::exit_status(&result);

    match result {
        Ok(outcome) => info!(?outcome, "Backup finished"),
        Err(e) => {
            let suggestion = e.suggestion();
            let e = anyhow::Error::new(e);
            error!("Command failed: {:#}", e);
            if let Some(suggestion) = suggestion {
                error!("Suggestion: {suggestion}");
            }
        }
    }

    std::process::exit(status);
}
