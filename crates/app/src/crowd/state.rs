//! Shared state handed to the frame streams, the HTTP handlers, and the
//! lifecycle manager.

use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use ml_core::{Detection, Detector};
use tokio::sync::watch;
use video_ingest::{CaptureSource, Frame};

use crate::crowd::processing::PipelineError;

/// Most recent density value, stored as `f64` bits so reads are never torn.
pub struct DensityCell(AtomicU64);

impl DensityCell {
    pub fn new() -> Self {
        Self(AtomicU64::new(0.0f64.to_bits()))
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, density: f64) {
        self.0.store(density.to_bits(), Ordering::Release);
    }
}

impl Default for DensityCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Set-once shutdown flag. Cloning shares the flag.
#[derive(Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Safe to call from any thread, including a signal
    /// handler thread; repeated calls are no-ops.
    pub fn set(&self) {
        self.tx.send_if_modified(|stopped| !std::mem::replace(stopped, true));
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the flag is set.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Sleep for `duration` unless the flag is set first. Returns `true` when
    /// woken by the flag.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.wait() => true,
            _ = tokio::time::sleep(duration) => self.is_set(),
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopSignal")
            .field("set", &self.is_set())
            .finish()
    }
}

/// Per-stream encoding settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamSettings {
    pub jpeg_quality: u8,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

/// Everything the service shares across streams and handlers.
pub struct AppContext {
    capture: Arc<dyn CaptureSource>,
    detector: Mutex<Box<dyn Detector>>,
    density: DensityCell,
    stop: StopSignal,
    settings: StreamSettings,
}

impl AppContext {
    pub fn new(
        capture: Arc<dyn CaptureSource>,
        detector: Box<dyn Detector>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            capture,
            detector: Mutex::new(detector),
            density: DensityCell::new(),
            stop: StopSignal::new(),
            settings,
        }
    }

    pub fn capture(&self) -> &dyn CaptureSource {
        self.capture.as_ref()
    }

    pub fn density(&self) -> &DensityCell {
        &self.density
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn settings(&self) -> StreamSettings {
        self.settings
    }

    /// Run the detector on `frame`, holding the detector lock for the call.
    pub(crate) fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, PipelineError> {
        let mut detector = self
            .detector
            .lock()
            .map_err(|_| PipelineError::DetectorPoisoned)?;
        detector
            .detect(&frame.data, frame.width, frame.height)
            .map_err(PipelineError::Inference)
    }

    pub(crate) fn detector_name(&self) -> &'static str {
        match self.detector.lock() {
            Ok(detector) => detector.name(),
            Err(_) => "poisoned",
        }
    }
}
