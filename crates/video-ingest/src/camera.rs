//! OpenCV-backed camera capture.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::{debug, info, warn};

use crate::{
    parse_device_index,
    source::CaptureSource,
    types::{CaptureError, Frame},
};

/// Camera opened through OpenCV's `VideoCapture`.
///
/// The handle sits behind a mutex so a release issued from the shutdown path
/// can never interleave with an in-flight read.
pub struct CameraCapture {
    uri: String,
    device: Mutex<Option<VideoCapture>>,
}

impl CameraCapture {
    /// Open `uri` (device index, `/dev/videoN`, file or stream URL) and
    /// optionally request a capture resolution.
    pub fn open(uri: &str, resolution: Option<(i32, i32)>) -> Result<Self, CaptureError> {
        let mut cap = open_video_capture(uri)?;
        if let Some(size) = resolution {
            configure_camera(&mut cap, size);
        }
        info!(source = uri, "capture device opened");
        Ok(Self {
            uri: uri.to_string(),
            device: Mutex::new(Some(cap)),
        })
    }

    fn device(&self) -> MutexGuard<'_, Option<VideoCapture>> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CaptureSource for CameraCapture {
    fn read(&self) -> Result<Option<Frame>, CaptureError> {
        let mut guard = self.device();
        let cap = guard.as_mut().ok_or(CaptureError::Released)?;

        let mut mat = Mat::default();
        let grabbed = cap
            .read(&mut mat)
            .map_err(|e| CaptureError::Other(e.into()))?;
        if !grabbed {
            return Ok(None);
        }

        let size = mat.size().map_err(|e| CaptureError::Other(e.into()))?;
        if size.width <= 0 || size.height <= 0 {
            return Ok(None);
        }
        if mat.typ() != core::CV_8UC3 {
            return Err(CaptureError::Other(anyhow::anyhow!(
                "unsupported pixel layout from {} (OpenCV type {})",
                self.uri,
                mat.typ()
            )));
        }

        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone().map_err(|e| CaptureError::Other(e.into()))?
        };
        let data = mat
            .data_bytes()
            .map_err(|e| CaptureError::Other(e.into()))?
            .to_vec();

        Frame::bgr8(data, size.width, size.height, Utc::now().timestamp_millis()).map(Some)
    }

    fn release(&self) {
        let mut guard = self.device();
        match guard.take() {
            Some(mut cap) => {
                if let Err(err) = cap.release() {
                    warn!(source = %self.uri, "capture release reported an error: {err}");
                }
                info!(source = %self.uri, "capture device released");
            }
            None => debug!(source = %self.uri, "capture device already released"),
        }
    }

    fn is_released(&self) -> bool {
        self.device().is_none()
    }
}

/// Attempt to open a camera input either by index or URI.
fn open_video_capture(uri: &str) -> Result<VideoCapture, CaptureError> {
    if let Some(index) = parse_device_index(uri) {
        for backend in [videoio::CAP_V4L, videoio::CAP_ANY] {
            match VideoCapture::new(index, backend) {
                Ok(cap) => {
                    if cap.is_opened().map_err(|e| CaptureError::Other(e.into()))? {
                        return Ok(cap);
                    }
                }
                Err(err) => {
                    warn!("failed to open device #{index} with backend {backend}: {err}");
                }
            }
        }
    }

    for backend in [videoio::CAP_V4L, videoio::CAP_ANY] {
        match VideoCapture::from_file(uri, backend) {
            Ok(cap) => {
                if cap.is_opened().map_err(|e| CaptureError::Other(e.into()))? {
                    return Ok(cap);
                }
            }
            Err(err) => {
                warn!("failed to open {uri} with backend {backend}: {err}");
            }
        }
    }

    Err(CaptureError::Open {
        uri: uri.to_string(),
    })
}

/// Request a capture resolution; drivers are free to ignore it.
fn configure_camera(cap: &mut VideoCapture, (width, height): (i32, i32)) {
    if !matches!(cap.set(videoio::CAP_PROP_FRAME_WIDTH, width as f64), Ok(true)) {
        debug!("capture backend ignored width request {width}");
    }
    if !matches!(cap.set(videoio::CAP_PROP_FRAME_HEIGHT, height as f64), Ok(true)) {
        debug!("capture backend ignored height request {height}");
    }
}
