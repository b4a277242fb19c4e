//! Crowd density: the share of the frame covered by confidently detected people.
//!
//! Boxes are summed without overlap correction, so the ratio exceeds 1.0 when
//! people overlap heavily. It is never clamped.

use ml_core::Detection;

/// Label counted towards density.
pub const PERSON_LABEL: &str = "person";
/// Detections must score strictly above this to count.
pub const PERSON_CONFIDENCE_THRESHOLD: f32 = 0.5;

pub fn is_counted_person(detection: &Detection) -> bool {
    detection.label == PERSON_LABEL && detection.confidence > PERSON_CONFIDENCE_THRESHOLD
}

/// The single filtering point: keep only the detections that count.
pub fn counted_people(detections: Vec<Detection>) -> Vec<Detection> {
    detections.into_iter().filter(is_counted_person).collect()
}

/// Summed box area of already-filtered `people` over the frame area.
///
/// A zero-area frame yields 0.0; capture sources never produce one.
pub fn occupancy(people: &[Detection], frame_height: u32, frame_width: u32) -> f64 {
    let frame_area = frame_height as f64 * frame_width as f64;
    if frame_area == 0.0 {
        return 0.0;
    }
    let covered: f64 = people
        .iter()
        .map(|person| person.bbox.width as f64 * person.bbox.height as f64)
        .sum();
    covered / frame_area
}

/// Density of an unfiltered detection list over a `frame_height x frame_width` frame.
pub fn density(detections: &[Detection], frame_height: u32, frame_width: u32) -> f64 {
    let people: Vec<Detection> = detections
        .iter()
        .filter(|detection| is_counted_person(detection))
        .cloned()
        .collect();
    occupancy(&people, frame_height, frame_width)
}

#[cfg(test)]
mod tests {
    use ml_core::{BoundingBox, YoloParams, yolo};

    use super::*;

    fn det(label: &str, confidence: f32, w: f32, h: f32) -> Detection {
        Detection::new(label, confidence, BoundingBox::new(0.0, 0.0, w, h))
    }

    #[test]
    fn empty_detections_yield_zero() {
        assert_eq!(density(&[], 480, 640), 0.0);
    }

    #[test]
    fn mixed_detections_only_count_confident_people() {
        let detections = vec![
            det("person", 0.9, 10.0, 10.0),
            det("person", 0.3, 100.0, 100.0),
            det("car", 0.9, 50.0, 50.0),
        ];
        assert_eq!(density(&detections, 100, 100), 0.01);
    }

    #[test]
    fn threshold_is_strict() {
        let detections = vec![det("person", 0.5, 10.0, 10.0)];
        assert_eq!(density(&detections, 100, 100), 0.0);
        let detections = vec![det("person", 0.5001, 10.0, 10.0)];
        assert_eq!(density(&detections, 100, 100), 0.01);
    }

    #[test]
    fn label_match_is_exact() {
        let detections = vec![det("Person", 0.9, 10.0, 10.0), det("persons", 0.9, 10.0, 10.0)];
        assert_eq!(density(&detections, 100, 100), 0.0);
    }

    #[test]
    fn overlapping_people_are_not_clamped() {
        let detections = vec![
            det("person", 0.9, 100.0, 100.0),
            det("person", 0.8, 100.0, 100.0),
        ];
        assert_eq!(density(&detections, 100, 100), 2.0);
    }

    #[test]
    fn rectangular_frames_use_height_times_width() {
        let detections = vec![det("person", 0.7, 32.0, 24.0)];
        let expected = (32.0 * 24.0) / (480.0 * 640.0);
        assert!((density(&detections, 480, 640) - expected).abs() < 1e-12);
    }

    #[test]
    fn counted_people_and_occupancy_match_density() {
        let detections = vec![
            det("person", 0.95, 20.0, 5.0),
            det("dog", 0.95, 20.0, 5.0),
            det("person", 0.2, 20.0, 5.0),
        ];
        let people = counted_people(detections.clone());
        assert_eq!(people.len(), 1);
        assert_eq!(occupancy(&people, 50, 50), density(&detections, 50, 50));
    }

    #[test]
    fn decoded_fractional_boxes_count_whole_pixels() {
        // One confident person of 10.6 x 10.6 model pixels on a 100x100 frame.
        let head = [50.0, 50.0, 10.6, 10.6, 0.9, 0.0];
        let params = YoloParams {
            input_size: 100,
            ..YoloParams::default()
        };
        let detections = yolo::decode(&head, 6, 1, &params, (100, 100)).unwrap();
        assert_eq!(density(&detections, 100, 100), 0.01);
    }

    #[test]
    fn zero_area_frame_does_not_divide() {
        let detections = vec![det("person", 0.9, 10.0, 10.0)];
        assert_eq!(density(&detections, 0, 100), 0.0);
    }
}
