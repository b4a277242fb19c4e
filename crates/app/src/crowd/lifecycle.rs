//! Shutdown coordination and capture-device release.
//!
//! The signal handler only flips the stop signal. Streams observe it between
//! frames, the server task observes it and stops gracefully, and the device
//! is released exactly once afterwards, or by [`ReleaseGuard`] on any other
//! exit path.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::crowd::state::{AppContext, StopSignal};

#[derive(Clone)]
pub struct Lifecycle {
    context: Arc<AppContext>,
    released: Arc<AtomicBool>,
}

impl Lifecycle {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_signal(&self) -> &StopSignal {
        self.context.stop_signal()
    }

    /// Route SIGINT and SIGTERM to the stop signal. The handler runs on a
    /// dedicated thread and does nothing else. Can only be installed once per
    /// process.
    pub fn install_signal_handler(&self) -> Result<()> {
        let stop = self.context.stop_signal().clone();
        ctrlc::set_handler(move || {
            if !stop.is_set() {
                info!("termination signal received");
            }
            stop.set();
        })
        .context("Failed to install termination signal handler")
    }

    /// Request shutdown programmatically.
    pub fn request_stop(&self) {
        self.context.stop_signal().set();
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait_for_stop(&self) {
        self.context.stop_signal().wait().await;
    }

    /// Release the capture device. Only the first call reaches the device;
    /// later calls return immediately.
    pub fn release_capture(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            debug!("capture device release already performed");
            return;
        }
        info!("releasing capture device");
        self.context.capture().release();
    }

    pub fn is_capture_released(&self) -> bool {
        self.released.load(Ordering::SeqCst) && self.context.capture().is_released()
    }

    /// Guard that releases the device when dropped.
    pub fn release_guard(&self) -> ReleaseGuard {
        ReleaseGuard {
            lifecycle: self.clone(),
        }
    }
}

/// Releases the capture device on drop, whatever path leaves the scope.
#[must_use = "the device is released when the guard is dropped"]
pub struct ReleaseGuard {
    lifecycle: Lifecycle,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.lifecycle.release_capture();
    }
}
