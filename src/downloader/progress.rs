//! Progress reporting for a backup run.
//!
//! Tracks processed shows against the total, derives the current rate and a
//! remaining-time estimate, and emits a log line every
//! [`PROGRESS_LOG_INTERVAL`] shows. An optional `indicatif` bar is advanced
//! alongside for interactive use.

use crate::downloader::aggregator::BackupSummary;
use crate::downloader::config::PROGRESS_LOG_INTERVAL;
use crate::downloader::item::FetchResult;
use indicatif::ProgressBar;
use std::time::{Duration, Instant};
use tracing::info;

/// Running progress state, owned by the single aggregation point
#[derive(Debug)]
pub struct ProgressState {
    /// Shows processed so far
    pub processed: usize,
    /// Shows in the run
    pub total: usize,
    /// When the run started
    pub start_time: Instant,
    log_interval: usize,
    bar: Option<ProgressBar>,
}

impl ProgressState {
    /// Start tracking `total` shows.
    pub fn new(total: usize, bar: Option<ProgressBar>) -> Self {
        if let Some(bar) = &bar {
            bar.set_length(total as u64);
        }
        Self {
            processed: 0,
            total,
            start_time: Instant::now(),
            log_interval: PROGRESS_LOG_INTERVAL,
            bar,
        }
    }

    /// Override how often a progress line is logged.
    pub fn with_log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval.max(1);
        self
    }

    /// Account for one finished show.
    pub fn record(&mut self, result: &FetchResult) {
        self.processed += 1;

        if let Some(bar) = &self.bar {
            bar.inc(1);
            if let FetchResult::Success(record) = result {
                bar.set_message(record.metadata.title.clone());
            }
        }

        if self.should_emit_update() {
            info!(
                processed = self.processed,
                total = self.total,
                "{}",
                self.format_progress()
            );
        }
    }

    /// Whether the latest record should produce a log line.
    pub fn should_emit_update(&self) -> bool {
        self.processed > 0
            && (self.processed % self.log_interval == 0 || self.processed == self.total)
    }

    /// Shows per second since the start
    pub fn current_rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Completion percentage (0-100)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 / self.total as f64 * 100.0
    }

    /// Remaining time at the current rate
    pub fn estimate_remaining(&self) -> Option<Duration> {
        let remaining = self.total.saturating_sub(self.processed);
        let rate = self.current_rate();
        if remaining == 0 || rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] Processed {}/{} shows - {:.1}% complete",
            self.processed,
            self.total,
            self.percentage()
        )];

        let rate = self.current_rate();
        if rate > 0.0 {
            parts.push(format!("at {rate:.1} shows/sec"));
        }

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }

    /// Close the bar and log the throughput summary.
    pub fn finish(&self, summary: &BackupSummary) {
        let elapsed = self.start_time.elapsed();
        if let Some(bar) = &self.bar {
            bar.finish_with_message(format!(
                "{} ok, {} degraded, {} failed",
                summary.succeeded, summary.degraded, summary.failed
            ));
        }

        let average = if self.processed > 0 {
            elapsed.as_secs_f64() / self.processed as f64
        } else {
            0.0
        };
        info!(
            processed = self.processed,
            elapsed_secs = elapsed.as_secs_f64(),
            avg_secs_per_show = average,
            "Backup fetch finished in {}",
            format_duration(elapsed)
        );
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
