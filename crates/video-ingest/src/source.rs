use crate::types::{CaptureError, Frame};

/// A camera-like device that hands out one frame per call.
///
/// Implementations guard the underlying handle internally: `read` and
/// `release` may be called from different threads and must never overlap.
pub trait CaptureSource: Send + Sync {
    /// Grab the next frame.
    ///
    /// `Ok(None)` means no frame was available right now and the caller may
    /// retry. Zero-area frames are reported as `Ok(None)` and never returned.
    /// Reading after [`CaptureSource::release`] fails with
    /// [`CaptureError::Released`].
    fn read(&self) -> Result<Option<Frame>, CaptureError>;

    /// Close the device handle. Idempotent.
    fn release(&self);

    /// Whether [`CaptureSource::release`] has run.
    fn is_released(&self) -> bool;
}
