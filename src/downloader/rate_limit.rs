//! Request pacing
//!
//! Spaces the start of successive remote calls by a fixed delay across all
//! workers, so the pool as a whole never exceeds the API's implicit rate
//! limit regardless of concurrency.

use crate::metrics;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Shared pacer handing out evenly spaced call slots
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Create a pacer spacing calls by `delay`. A zero delay disables pacing.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    /// Configured spacing
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the next free slot.
    ///
    /// Slots are reserved under the lock and waited for outside it, so
    /// concurrent callers queue up one `delay` apart instead of serializing
    /// on the sleep.
    pub async fn acquire(&self) {
        if self.delay.is_zero() {
            return;
        }

        let requested = Instant::now();
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.delay);
            slot
        };

        sleep_until(slot).await;
        metrics::record_pacer_wait(requested.elapsed());
    }
}
