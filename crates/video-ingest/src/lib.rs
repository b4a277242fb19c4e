//! Frame sources for the crowd-density service.
//!
//! Capture is pull-based: the consumer asks a [`CaptureSource`] for one frame
//! at a time and decides itself how to wait when none is available. The
//! OpenCV camera backend lives behind the `with-opencv` feature.

mod source;
mod types;

#[cfg(feature = "with-opencv")]
mod camera;

#[cfg(feature = "with-opencv")]
pub use camera::CameraCapture;
pub use source::CaptureSource;
pub use types::{CaptureError, Frame, FrameFormat};

/// Parse a `/dev/videoX` style URI (or a bare index) and return the
/// zero-based device index if present.
pub fn parse_device_index(uri: &str) -> Option<i32> {
    if let Ok(index) = uri.parse::<i32>() {
        return Some(index);
    }
    if let Some(stripped) = uri.strip_prefix("/dev/video") {
        if !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(index) = stripped.parse::<i32>() {
                return Some(index);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::parse_device_index;

    #[test]
    fn device_index_from_bare_number() {
        assert_eq!(parse_device_index("0"), Some(0));
        assert_eq!(parse_device_index("3"), Some(3));
    }

    #[test]
    fn device_index_from_dev_path() {
        assert_eq!(parse_device_index("/dev/video2"), Some(2));
        assert_eq!(parse_device_index("/dev/video"), None);
        assert_eq!(parse_device_index("/dev/videoX"), None);
    }

    #[test]
    fn urls_are_not_device_indices() {
        assert_eq!(parse_device_index("rtsp://camera.local/stream"), None);
        assert_eq!(parse_device_index("clip.mp4"), None);
    }
}
