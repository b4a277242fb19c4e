//! Detection types, the [`Detector`] seam, and YOLOv8 post-processing.
//!
//! Enable the `with-tch` feature to pull in the `tch` crate and the
//! TorchScript backend.

pub mod detection;
pub mod detector;
pub mod yolo;

#[cfg(feature = "with-tch")]
mod torch;

pub use detection::{BoundingBox, Detection};
pub use detector::Detector;
pub use yolo::{COCO_LABELS, YoloParams};

#[cfg(feature = "with-tch")]
pub use tch;
#[cfg(feature = "with-tch")]
pub use torch::TorchDetector;
