//! One-shot analysis of an uploaded still image.
//!
//! Runs the shared detector once and reports the person count and density of
//! that image. The live density published by the frame loop is left alone.

use actix_web::{ResponseError, http::StatusCode};
use image::ImageError;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use video_ingest::Frame;

use crate::crowd::{
    density::{counted_people, occupancy},
    processing::PipelineError,
    state::AppContext,
};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Serialize, PartialEq)]
pub struct StillImageReport {
    /// Detections counted as people.
    pub people: usize,
    pub density: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum StillImageError {
    #[error("uploaded image holds no pixels")]
    Empty,
    #[error("upload is not a decodable image: {0}")]
    Decode(#[source] ImageError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ResponseError for StillImageError {
    fn status_code(&self) -> StatusCode {
        match self {
            StillImageError::Empty | StillImageError::Decode(_) => StatusCode::BAD_REQUEST,
            StillImageError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Decode an encoded image (JPEG or PNG), detect people in it, and measure
/// their coverage.
pub fn analyze_still(
    context: &AppContext,
    encoded: &[u8],
) -> Result<StillImageReport, StillImageError> {
    if encoded.is_empty() {
        return Err(StillImageError::Empty);
    }
    let rgb = image::load_from_memory(encoded)
        .map_err(StillImageError::Decode)?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(StillImageError::Empty);
    }

    let bgr: Vec<u8> = rgb.pixels().flat_map(|px| [px[2], px[1], px[0]]).collect();
    let frame =
        Frame::bgr8(bgr, width as i32, height as i32, 0).map_err(PipelineError::from)?;
    let people = counted_people(context.detect(&frame)?);
    let density = occupancy(&people, height, width);

    metrics::counter!("crowd_still_images_total").increment(1);
    info!(people = people.len(), density, width, height, "analyzed uploaded image");

    Ok(StillImageReport {
        people: people.len(),
        density,
        width,
        height,
    })
}
