use anyhow::Result;

use crate::detection::Detection;

/// Object detector seam.
///
/// Implementations receive a packed BGR8 frame and return every object they
/// found, in frame pixel coordinates. Filtering by class or confidence beyond
/// the model's own candidate threshold is left to the caller.
pub trait Detector: Send {
    /// Backend identifier used in logs.
    fn name(&self) -> &'static str;

    /// Run inference on one frame.
    fn detect(&mut self, bgr: &[u8], width: i32, height: i32) -> Result<Vec<Detection>>;
}
