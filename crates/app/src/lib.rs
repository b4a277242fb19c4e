//! Webcam person detection served as an annotated MJPEG feed with a live
//! crowd-density metric.

pub mod crowd;
pub mod html;
