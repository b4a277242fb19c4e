//! The frame loop: capture, detect, filter, annotate, measure, encode, emit.
//!
//! Each `/video_feed` request pulls its own [`frame_stream`] over the shared
//! [`AppContext`]. Inference and encoding run synchronously on the task that
//! polls the stream, so a slow model stalls that worker for the duration.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use actix_web::{ResponseError, web::Bytes};
use async_stream::try_stream;
use futures::Stream;
use image::ImageError;
use ml_core::Detection;
use thiserror::Error;
use tracing::{debug, trace};
use video_ingest::{CaptureError, Frame};

use crate::crowd::{
    annotation::{annotate_people, draw_density_overlay},
    density::{counted_people, occupancy},
    encoding::{encode_jpeg, frame_to_rgb, multipart_chunk},
    state::AppContext,
};

/// Fixed pause between emitted frames; caps the inference rate.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);
/// Pause before retrying when the camera had no frame ready.
pub const CAPTURE_RETRY_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("detector inference failed: {0:#}")]
    Inference(anyhow::Error),
    #[error("detector is unusable after a panic during inference")]
    DetectorPoisoned,
    #[error("frame buffer of {len} bytes does not describe a {width}x{height} image")]
    FrameLayout { width: i32, height: i32, len: usize },
    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] ImageError),
}

impl ResponseError for PipelineError {}

/// Outcome of one loop iteration.
pub struct ProcessedFrame {
    pub jpeg: Vec<u8>,
    pub people: Vec<Detection>,
    pub density: f64,
}

/// Run detection on `frame`, annotate it, publish the new density, and
/// encode the result.
pub fn process_frame(context: &AppContext, frame: Frame) -> Result<ProcessedFrame, PipelineError> {
    let inference_start = Instant::now();
    let detections = context.detect(&frame)?;
    metrics::histogram!("crowd_stage_latency_seconds", "stage" => "inference")
        .record(inference_start.elapsed().as_secs_f64());

    let people = counted_people(detections);
    metrics::gauge!("crowd_people").set(people.len() as f64);
    if !people.is_empty() {
        debug!(people = people.len(), "counted people");
        for (idx, person) in people.iter().enumerate() {
            trace!(
                "  #{idx}: conf={:.3} bbox={:?}",
                person.confidence, person.bbox
            );
        }
    }

    let encode_start = Instant::now();
    let mut image = frame_to_rgb(&frame)?;
    annotate_people(&mut image, &people);

    let density = occupancy(&people, frame.height as u32, frame.width as u32);
    context.density().store(density);
    metrics::gauge!("crowd_density").set(density);

    draw_density_overlay(&mut image, density);
    let jpeg = encode_jpeg(&image, context.settings().jpeg_quality)?;
    metrics::histogram!("crowd_stage_latency_seconds", "stage" => "encoding")
        .record(encode_start.elapsed().as_secs_f64());

    Ok(ProcessedFrame {
        jpeg,
        people,
        density,
    })
}

/// Lazy, unbounded stream of multipart JPEG chunks.
///
/// Ends when the stop signal is observed, either before an iteration or
/// while suspended, or after yielding the first unrecovered error. Frames
/// that are not ready are retried and never surface to the client.
pub fn frame_stream(
    context: Arc<AppContext>,
) -> impl Stream<Item = Result<Bytes, PipelineError>> + 'static {
    try_stream! {
        let stop = context.stop_signal().clone();
        let _active = ActiveStream::enter();
        let stream_span = tracing::info_span!("stream", detector = context.detector_name());
        let mut frame_number: u64 = 0;

        while !stop.is_set() {
            let frame = match context.capture().read()? {
                Some(frame) => frame,
                None => {
                    metrics::counter!("crowd_capture_misses_total").increment(1);
                    debug!(parent: &stream_span, "no frame available; retrying");
                    stop.sleep(CAPTURE_RETRY_INTERVAL).await;
                    continue;
                }
            };

            frame_number = frame_number.wrapping_add(1);
            let frame_span = tracing::info_span!(
                parent: &stream_span,
                "frame",
                frame = frame_number,
                width = frame.width,
                height = frame.height,
                timestamp = frame.timestamp_ms
            );
            let processed = frame_span.in_scope(|| process_frame(&context, frame))?;
            metrics::counter!("crowd_frames_total").increment(1);
            if frame_number % 50 == 0 {
                debug!(
                    parent: &stream_span,
                    "stream heartbeat: frame #{frame_number}, density {:.4}",
                    processed.density
                );
            }

            yield multipart_chunk(&processed.jpeg);

            stop.sleep(FRAME_INTERVAL).await;
        }

        debug!(
            parent: &stream_span,
            "stop signal observed; closing frame stream after {frame_number} frame(s)"
        );
    }
}

/// Tracks the number of live streams in the `crowd_active_streams` gauge.
struct ActiveStream;

impl ActiveStream {
    fn enter() -> Self {
        metrics::gauge!("crowd_active_streams").increment(1.0);
        ActiveStream
    }
}

impl Drop for ActiveStream {
    fn drop(&mut self) {
        metrics::gauge!("crowd_active_streams").decrement(1.0);
    }
}
