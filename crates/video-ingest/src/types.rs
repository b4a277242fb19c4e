use anyhow::Error;
use thiserror::Error;

/// Raw BGR frame captured from a video source.
#[derive(Clone, Debug)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: i32,
    pub height: i32,
    pub timestamp_ms: i64,
    pub format: FrameFormat,
}

impl Frame {
    /// Wrap a packed BGR8 buffer, rejecting zero-area frames and buffers whose
    /// length does not match the stated geometry.
    pub fn bgr8(
        data: Vec<u8>,
        width: i32,
        height: i32,
        timestamp_ms: i64,
    ) -> Result<Self, CaptureError> {
        if width <= 0 || height <= 0 {
            return Err(CaptureError::EmptyFrame { width, height });
        }
        let expected = width as usize * height as usize * FrameFormat::Bgr8.bytes_per_pixel();
        if data.len() != expected {
            return Err(CaptureError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ms,
            format: FrameFormat::Bgr8,
        })
    }

    /// Pixel count of the frame. Always non-zero for frames built via [`Frame::bgr8`].
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    Bgr8,
}

impl FrameFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            FrameFormat::Bgr8 => 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open video source {uri:?}")]
    Open { uri: String },
    #[error("frame has zero area ({width}x{height})")]
    EmptyFrame { width: i32, height: i32 },
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("capture device has been released")]
    Released,
    #[error(transparent)]
    Other(#[from] Error),
}
