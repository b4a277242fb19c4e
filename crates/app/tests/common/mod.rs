#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use anyhow::{Result, anyhow};
use crowd_density::crowd::state::{AppContext, StopSignal, StreamSettings};
use ml_core::{BoundingBox, Detection, Detector};
use video_ingest::{CaptureError, CaptureSource, Frame};

pub fn solid_frame(width: i32, height: i32) -> Frame {
    Frame::bgr8(vec![40; (width * height * 3) as usize], width, height, 0).unwrap()
}

pub fn detection(label: &str, confidence: f32, bbox: (f32, f32, f32, f32)) -> Detection {
    Detection::new(
        label,
        confidence,
        BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3),
    )
}

/// person@0.9 (0,0,10,10), person@0.3 (0,0,100,100), car@0.9 (0,0,50,50).
pub fn mixed_detections() -> Vec<Detection> {
    vec![
        detection("person", 0.9, (0.0, 0.0, 10.0, 10.0)),
        detection("person", 0.3, (0.0, 0.0, 100.0, 100.0)),
        detection("car", 0.9, (0.0, 0.0, 50.0, 50.0)),
    ]
}

/// Capture source replaying a script of reads, then repeating `fallback`.
pub struct ScriptedCapture {
    script: Mutex<VecDeque<Option<Frame>>>,
    fallback: Option<Frame>,
    reads: AtomicUsize,
    release_calls: AtomicUsize,
    released: AtomicBool,
    stop_after: Mutex<Option<(usize, StopSignal)>>,
}

impl ScriptedCapture {
    pub fn new(script: Vec<Option<Frame>>, fallback: Option<Frame>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            reads: AtomicUsize::new(0),
            release_calls: AtomicUsize::new(0),
            released: AtomicBool::new(false),
            stop_after: Mutex::new(None),
        })
    }

    /// Always hands out the same frame.
    pub fn repeating(frame: Frame) -> Arc<Self> {
        Self::new(Vec::new(), Some(frame))
    }

    /// Set `stop` right after the `reads`-th successful read.
    pub fn stop_after(&self, reads: usize, stop: StopSignal) {
        *self.stop_after.lock().unwrap() = Some((reads, stop));
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }
}

impl CaptureSource for ScriptedCapture {
    fn read(&self) -> Result<Option<Frame>, CaptureError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(CaptureError::Released);
        }
        let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        let next = match self.script.lock().unwrap().pop_front() {
            Some(scripted) => scripted,
            None => self.fallback.clone(),
        };
        if let Some((limit, stop)) = self.stop_after.lock().unwrap().as_ref() {
            if read >= *limit {
                stop.set();
            }
        }
        Ok(next)
    }

    fn release(&self) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.released.store(true, Ordering::SeqCst);
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Detector replaying scripted outputs, repeating the last one.
pub struct ScriptedDetector {
    outputs: VecDeque<Vec<Detection>>,
    last: Vec<Detection>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn fixed(detections: Vec<Detection>) -> Self {
        Self::sequence(vec![detections])
    }

    pub fn sequence(outputs: Vec<Vec<Detection>>) -> Self {
        Self {
            outputs: outputs.into(),
            last: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _bgr: &[u8], _width: i32, _height: i32) -> Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.outputs.pop_front() {
            self.last = next;
        }
        Ok(self.last.clone())
    }
}

pub struct FailingDetector;

impl Detector for FailingDetector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect(&mut self, _bgr: &[u8], _width: i32, _height: i32) -> Result<Vec<Detection>> {
        Err(anyhow!("model exploded"))
    }
}

pub fn context(capture: Arc<ScriptedCapture>, detector: impl Detector + 'static) -> Arc<AppContext> {
    Arc::new(AppContext::new(
        capture,
        Box::new(detector),
        StreamSettings::default(),
    ))
}
