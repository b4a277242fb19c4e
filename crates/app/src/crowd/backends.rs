//! Concrete capture and detector backends, selected by cargo features.

use std::sync::Arc;

#[cfg(not(all(feature = "with-opencv", feature = "with-tch")))]
use anyhow::bail;
#[cfg(any(feature = "with-opencv", feature = "with-tch"))]
use anyhow::Context;
use anyhow::Result;
use ml_core::Detector;
use video_ingest::CaptureSource;

use crate::crowd::config::CrowdConfig;

#[cfg(feature = "with-opencv")]
pub(crate) fn open_capture(config: &CrowdConfig) -> Result<Arc<dyn CaptureSource>> {
    let camera = video_ingest::CameraCapture::open(&config.source_uri, config.capture_size)
        .with_context(|| format!("Failed to open capture source {}", config.source_uri))?;
    Ok(Arc::new(camera))
}

#[cfg(not(feature = "with-opencv"))]
pub(crate) fn open_capture(_config: &CrowdConfig) -> Result<Arc<dyn CaptureSource>> {
    bail!("built without camera support; rebuild with `--features with-opencv`")
}

#[cfg(feature = "with-tch")]
pub(crate) fn load_detector(config: &CrowdConfig) -> Result<Box<dyn Detector>> {
    use ml_core::{
        TorchDetector, YoloParams,
        tch::{Cuda, Device},
    };
    use tracing::info;

    let device = if config.use_cpu {
        Device::Cpu
    } else {
        let preloaded = crate::crowd::runtime::preload_cuda_runtime();
        let device = Device::cuda_if_available();
        if device == Device::Cpu {
            info!(preloaded, "CUDA unavailable; running the detector on CPU");
        }
        device
    };

    let params = YoloParams {
        input_size: config.detector_size,
        ..YoloParams::default()
    };
    let detector = TorchDetector::load(&config.model_path, device, params).with_context(|| {
        format!("Failed to load detector model {}", config.model_path.display())
    })?;
    info!(
        device = ?detector.device(),
        cuda_devices = Cuda::device_count(),
        input = config.detector_size,
        "detector loaded"
    );
    Ok(Box::new(detector))
}

#[cfg(not(feature = "with-tch"))]
pub(crate) fn load_detector(_config: &CrowdConfig) -> Result<Box<dyn Detector>> {
    bail!("built without inference support; rebuild with `--features with-tch`")
}
