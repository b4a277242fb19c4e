//! YOLOv8 pre- and post-processing shared by inference backends.
//!
//! The exported model takes a `[1, 3, S, S]` RGB tensor scaled to `0..1` and
//! produces `[1, 4 + classes, anchors]`: per anchor a centre-format box in
//! model pixels followed by one score per class. Frames are letterboxed into
//! the square input, keeping their aspect ratio, and decoded boxes are mapped
//! back through the same transform.

use image::{
    ImageBuffer, Rgb,
    imageops::{self, FilterType},
};
use thiserror::Error;

use crate::detection::{BoundingBox, Detection};

/// Class names of the COCO-trained YOLOv8 checkpoints, indexed by class id.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Label for a class id, `"unknown"` past the end of the table.
pub fn coco_label(class_id: usize) -> &'static str {
    COCO_LABELS.get(class_id).copied().unwrap_or("unknown")
}

/// Inference knobs for the YOLOv8 head.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloParams {
    /// Square model input side in pixels.
    pub input_size: u32,
    /// Candidate threshold applied before NMS.
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("detector output needs at least 5 channels (x, y, w, h, score), got {0}")]
    TooFewChannels(usize),
    #[error("detector output holds {actual} values, expected {channels}x{anchors}")]
    Shape {
        channels: usize,
        anchors: usize,
        actual: usize,
    },
    #[error("frame buffer holds {actual} bytes, expected {expected} for {width}x{height} BGR")]
    FrameSize {
        width: i32,
        height: i32,
        expected: usize,
        actual: usize,
    },
}

/// Grey used by YOLOv8 for letterbox padding.
pub const LETTERBOX_FILL: u8 = 114;

/// Uniform scale plus centring offsets that fit a frame into the square model
/// input without distorting it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    /// Scaled frame size inside the input square.
    pub content: (u32, u32),
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn fit(frame_width: i32, frame_height: i32, input_size: u32) -> Self {
        let input = input_size.max(1);
        let (w, h) = (frame_width.max(1) as f32, frame_height.max(1) as f32);
        let scale = (input as f32 / w).min(input as f32 / h);
        let content_w = ((w * scale).round() as u32).clamp(1, input);
        let content_h = ((h * scale).round() as u32).clamp(1, input);
        Self {
            scale,
            content: (content_w, content_h),
            pad_x: (input - content_w) / 2,
            pad_y: (input - content_h) / 2,
        }
    }

    /// Map a point in model pixels back to frame pixels.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Letterbox a packed BGR8 frame into the model input and lay it out as
/// planar RGB floats in `0..1` (`C x S x S`).
pub fn bgr_to_chw(
    bgr: &[u8],
    width: i32,
    height: i32,
    input_size: u32,
) -> Result<Vec<f32>, DecodeError> {
    let expected = width.max(0) as usize * height.max(0) as usize * 3;
    if width <= 0 || height <= 0 || bgr.len() != expected {
        return Err(DecodeError::FrameSize {
            width,
            height,
            expected,
            actual: bgr.len(),
        });
    }

    let rgb: Vec<u8> = bgr
        .chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect();
    let image = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_vec(width as u32, height as u32, rgb)
        .ok_or(DecodeError::FrameSize {
            width,
            height,
            expected,
            actual: bgr.len(),
        })?;
    let letterbox = Letterbox::fit(width, height, input_size);
    let resized = if image.dimensions() == letterbox.content {
        image
    } else {
        let (content_w, content_h) = letterbox.content;
        imageops::resize(&image, content_w, content_h, FilterType::Triangle)
    };
    let mut canvas = ImageBuffer::from_pixel(input_size, input_size, Rgb([LETTERBOX_FILL; 3]));
    imageops::replace(
        &mut canvas,
        &resized,
        letterbox.pad_x as i64,
        letterbox.pad_y as i64,
    );

    let plane = (input_size * input_size) as usize;
    let mut chw = vec![0.0f32; plane * 3];
    for (idx, pixel) in canvas.pixels().enumerate() {
        chw[idx] = pixel[0] as f32 / 255.0;
        chw[plane + idx] = pixel[1] as f32 / 255.0;
        chw[2 * plane + idx] = pixel[2] as f32 / 255.0;
    }
    Ok(chw)
}

/// Decode a channel-major `[channels, anchors]` YOLOv8 head into detections
/// in frame pixels, applying the candidate threshold and per-class NMS.
///
/// Box corners are clipped to the frame, then the origin and the size are
/// truncated to whole pixels. Boxes narrower or shorter than one pixel are
/// dropped.
pub fn decode(
    output: &[f32],
    channels: usize,
    anchors: usize,
    params: &YoloParams,
    frame_size: (i32, i32),
) -> Result<Vec<Detection>, DecodeError> {
    if channels < 5 {
        return Err(DecodeError::TooFewChannels(channels));
    }
    if output.len() != channels * anchors {
        return Err(DecodeError::Shape {
            channels,
            anchors,
            actual: output.len(),
        });
    }

    let (frame_w, frame_h) = (frame_size.0.max(1) as f32, frame_size.1.max(1) as f32);
    let letterbox = Letterbox::fit(frame_size.0, frame_size.1, params.input_size);
    let at = |channel: usize, anchor: usize| output[channel * anchors + anchor];

    let mut candidates: Vec<(usize, Detection)> = Vec::new();
    for anchor in 0..anchors {
        let (class_id, score) = (4..channels)
            .map(|channel| (channel - 4, at(channel, anchor)))
            .fold((0, f32::MIN), |best, current| {
                if current.1 > best.1 { current } else { best }
            });
        if score < params.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        let (left, top) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (right, bottom) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);
        let (left, right) = (left.clamp(0.0, frame_w), right.clamp(0.0, frame_w));
        let (top, bottom) = (top.clamp(0.0, frame_h), bottom.clamp(0.0, frame_h));
        let width = (right - left).trunc();
        let height = (bottom - top).trunc();
        if width < 1.0 || height < 1.0 {
            continue;
        }

        candidates.push((
            class_id,
            Detection::new(
                coco_label(class_id),
                score.min(1.0),
                BoundingBox::new(left.trunc(), top.trunc(), width, height),
            ),
        ));
    }

    Ok(non_max_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}

/// Greedy per-class NMS, highest confidence first.
fn non_max_suppression(
    mut candidates: Vec<(usize, Detection)>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));

    let mut kept: Vec<(usize, Detection)> = Vec::new();
    for (class_id, candidate) in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|(kept_class, kept_det)| {
            *kept_class == class_id && kept_det.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push((class_id, candidate));
        }
    }
    kept.into_iter().map(|(_, det)| det).collect()
}
