//! JPEG encoding and multipart framing for the MJPEG feed.

use actix_web::web::Bytes;
use image::{ImageError, RgbImage, codecs::jpeg::JpegEncoder};
use video_ingest::{Frame, FrameFormat};

use crate::crowd::processing::PipelineError;

/// Boundary token shared by the response header and every chunk.
pub const MULTIPART_BOUNDARY: &str = "frame";
/// Exact `Content-Type` of `/video_feed`.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Convert a captured BGR frame into an RGB image that annotation can draw on.
pub fn frame_to_rgb(frame: &Frame) -> Result<RgbImage, PipelineError> {
    let layout_error = || PipelineError::FrameLayout {
        width: frame.width,
        height: frame.height,
        len: frame.data.len(),
    };
    if frame.width <= 0 || frame.height <= 0 {
        return Err(layout_error());
    }
    let rgb = match frame.format {
        FrameFormat::Bgr8 => frame
            .data
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect::<Vec<u8>>(),
    };
    RgbImage::from_vec(frame.width as u32, frame.height as u32, rgb).ok_or_else(layout_error)
}

/// Encode `image` as a baseline JPEG at `quality` (clamped to 1..=100).
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::with_capacity(image.as_raw().len() / 8);
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(image)?;
    Ok(buffer)
}

/// Wrap one JPEG in a multipart part: boundary, content type, blank line,
/// payload, trailing CRLF.
pub fn multipart_chunk(jpeg: &[u8]) -> Bytes {
    let mut payload = Vec::with_capacity(jpeg.len() + 64);
    payload.extend_from_slice(b"--");
    payload.extend_from_slice(MULTIPART_BOUNDARY.as_bytes());
    payload.extend_from_slice(b"\r\n");
    payload.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    payload.extend_from_slice(jpeg);
    payload.extend_from_slice(b"\r\n");
    Bytes::from(payload)
}
