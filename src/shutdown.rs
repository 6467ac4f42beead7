//! Graceful shutdown coordination utilities.
//!
//! Provides a [`ShutdownCoordinator`] shared by the backup workers. Once a stop
//! is requested, workers finish the show they are currently fetching and then
//! exit without claiming further work; no in-flight request is abandoned.
//!
//! The process-wide handle (raised by Ctrl+C) is never raised by a run
//! itself. Each backup run works on a [`ScopedShutdown`]: a child handle that
//! follows its parent, so Ctrl+C stops the run, while a run-fatal condition
//! such as a rejected session stops only that run.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Shared handle to a shutdown coordinator.
pub type SharedShutdown = Arc<ShutdownCoordinator>;

static GLOBAL_SHUTDOWN: OnceCell<SharedShutdown> = OnceCell::new();

/// Register a global shutdown handle so subsystems can discover it lazily.
pub fn set_global_shutdown(handle: SharedShutdown) {
    let _ = GLOBAL_SHUTDOWN.set(handle);
}

/// Retrieve the registered global shutdown handle, if available.
pub fn get_global_shutdown() -> Option<SharedShutdown> {
    GLOBAL_SHUTDOWN.get().cloned()
}

/// Coordinates graceful shutdown across async tasks.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    is_shutdown: AtomicBool,
    notify: Notify,
}

impl ShutdownCoordinator {
    /// Create a new coordinator.
    pub fn new() -> Self {
        Self {
            is_shutdown: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Create a new shared coordinator wrapped in [`Arc`].
    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Request shutdown. Notifies all registered waiters exactly once.
    pub fn request_shutdown(&self) {
        if !self.is_shutdown.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested. Returns immediately if already set.
    pub async fn wait_for_shutdown(&self) {
        // Register interest before checking the flag so a request landing in
        // between is not missed.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }
}

/// Stop handle for one run, raised when its parent is.
///
/// Forwarding stops when the scope is dropped.
#[derive(Debug)]
pub struct ScopedShutdown {
    handle: SharedShutdown,
    forwarder: Option<JoinHandle<()>>,
}

impl ScopedShutdown {
    /// Create a run-scoped handle following `parent`, if any.
    ///
    /// An already raised parent yields an already raised handle. Must be
    /// called inside a Tokio runtime when `parent` is set.
    pub fn new(parent: Option<&SharedShutdown>) -> Self {
        let handle = ShutdownCoordinator::shared();
        let forwarder = parent.map(|parent| {
            if parent.is_shutdown_requested() {
                handle.request_shutdown();
            }
            let parent = parent.clone();
            let child = handle.clone();
            tokio::spawn(async move {
                parent.wait_for_shutdown().await;
                child.request_shutdown();
            })
        });

        Self { handle, forwarder }
    }

    /// The run-scoped handle
    pub fn handle(&self) -> &SharedShutdown {
        &self.handle
    }
}

impl Drop for ScopedShutdown {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}
