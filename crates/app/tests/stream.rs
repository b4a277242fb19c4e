mod common;

use std::{
    sync::atomic::Ordering,
    time::{Duration, Instant},
};

use common::{
    FailingDetector, ScriptedCapture, ScriptedDetector, context, detection, mixed_detections,
    solid_frame,
};
use crowd_density::crowd::processing::{CAPTURE_RETRY_INTERVAL, PipelineError, frame_stream};
use futures::StreamExt;
use video_ingest::CaptureError;

const CHUNK_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

#[tokio::test]
async fn chunks_are_multipart_wrapped_jpegs() {
    let capture = ScriptedCapture::repeating(solid_frame(64, 48));
    let ctx = context(capture, ScriptedDetector::fixed(Vec::new()));
    let mut stream = Box::pin(frame_stream(ctx));

    let chunk = stream.next().await.expect("stream ended").expect("chunk failed");
    assert!(chunk.starts_with(CHUNK_HEADER));
    assert_eq!(&chunk[CHUNK_HEADER.len()..CHUNK_HEADER.len() + 2], &[0xFF, 0xD8]);
    assert!(chunk.ends_with(b"\xFF\xD9\r\n"));

    let jpeg = &chunk[CHUNK_HEADER.len()..chunk.len() - 2];
    let decoded = image::load_from_memory(jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));
}

#[tokio::test]
async fn density_counts_only_confident_people() {
    let capture = ScriptedCapture::repeating(solid_frame(100, 100));
    let ctx = context(capture, ScriptedDetector::fixed(mixed_detections()));
    let mut stream = Box::pin(frame_stream(ctx.clone()));

    assert_eq!(ctx.density().load(), 0.0);
    stream.next().await.unwrap().unwrap();
    assert_eq!(ctx.density().load(), 0.01);
}

#[tokio::test]
async fn density_follows_the_latest_frame() {
    let capture = ScriptedCapture::repeating(solid_frame(100, 100));
    let detector = ScriptedDetector::sequence(vec![
        vec![detection("person", 0.9, (0.0, 0.0, 10.0, 10.0))],
        Vec::new(),
        vec![
            detection("person", 0.9, (0.0, 0.0, 100.0, 100.0)),
            detection("person", 0.9, (0.0, 0.0, 50.0, 100.0)),
        ],
    ]);
    let ctx = context(capture, detector);
    let mut stream = Box::pin(frame_stream(ctx.clone()));

    stream.next().await.unwrap().unwrap();
    assert_eq!(ctx.density().load(), 0.01);
    stream.next().await.unwrap().unwrap();
    assert_eq!(ctx.density().load(), 0.0);
    stream.next().await.unwrap().unwrap();
    // overlapping boxes push past 1.0 and are not clamped
    assert_eq!(ctx.density().load(), 1.5);
}

#[tokio::test]
async fn missing_frames_are_retried() {
    let capture = ScriptedCapture::new(vec![None, None], Some(solid_frame(32, 32)));
    let detector = ScriptedDetector::fixed(Vec::new());
    let calls = detector.calls();
    let ctx = context(capture.clone(), detector);
    let mut stream = Box::pin(frame_stream(ctx));

    let started = Instant::now();
    let chunk = stream.next().await.unwrap().unwrap();
    assert!(chunk.starts_with(CHUNK_HEADER));
    assert_eq!(capture.reads(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() >= CAPTURE_RETRY_INTERVAL * 2);
}

#[tokio::test]
async fn detector_failure_ends_the_stream() {
    let capture = ScriptedCapture::repeating(solid_frame(32, 32));
    let ctx = context(capture, FailingDetector);
    let mut stream = Box::pin(frame_stream(ctx.clone()));

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, PipelineError::Inference(_)));
    assert!(err.to_string().contains("model exploded"));
    assert!(stream.next().await.is_none());
    assert_eq!(ctx.density().load(), 0.0);
}

#[tokio::test]
async fn reading_a_released_device_ends_the_stream() {
    let capture = ScriptedCapture::repeating(solid_frame(32, 32));
    let ctx = context(capture, ScriptedDetector::fixed(Vec::new()));
    ctx.capture().release();
    let mut stream = Box::pin(frame_stream(ctx));

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, PipelineError::Capture(CaptureError::Released)));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn stop_ends_the_stream_within_one_interval() {
    let capture = ScriptedCapture::repeating(solid_frame(32, 32));
    let ctx = context(capture.clone(), ScriptedDetector::fixed(Vec::new()));
    let mut stream = Box::pin(frame_stream(ctx.clone()));

    stream.next().await.unwrap().unwrap();
    let reads_before_stop = capture.reads();
    ctx.stop_signal().set();

    let next = tokio::time::timeout(Duration::from_millis(150), stream.next())
        .await
        .expect("stream did not observe the stop signal in time");
    assert!(next.is_none());
    assert_eq!(capture.reads(), reads_before_stop);
}

#[tokio::test]
async fn stop_during_capture_retry_ends_the_stream() {
    let capture = ScriptedCapture::new(Vec::new(), None);
    let ctx = context(capture.clone(), ScriptedDetector::fixed(Vec::new()));
    let mut stream = Box::pin(frame_stream(ctx.clone()));

    let stop = ctx.stop_signal().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        stop.set();
    });

    let next = tokio::time::timeout(Duration::from_millis(500), stream.next())
        .await
        .expect("stream kept retrying after stop");
    assert!(next.is_none());
    assert!(capture.reads() >= 1);
}

#[tokio::test]
async fn stopped_context_emits_nothing() {
    let capture = ScriptedCapture::repeating(solid_frame(32, 32));
    let ctx = context(capture.clone(), ScriptedDetector::fixed(Vec::new()));
    ctx.stop_signal().set();

    let mut stream = Box::pin(frame_stream(ctx));
    assert!(stream.next().await.is_none());
    assert_eq!(capture.reads(), 0);
}
