use std::{path::Path, time::Instant};

use anyhow::{Result, bail};
use tch::{self, Device, Kind, Tensor};
use tracing::{debug, info};

use crate::{
    detection::Detection,
    detector::Detector,
    yolo::{self, YoloParams},
};

/// TorchScript-backed YOLOv8 detector.
pub struct TorchDetector {
    module: tch::CModule,
    device: Device,
    params: YoloParams,
}

impl TorchDetector {
    /// Load a TorchScript export and prepare it for inference on `device`.
    pub fn load<P: AsRef<Path>>(model_path: P, device: Device, params: YoloParams) -> Result<Self> {
        let model_path = model_path.as_ref();
        let mut module = tch::CModule::load_on_device(model_path, device)?;
        module.set_eval();
        info!(
            model = %model_path.display(),
            ?device,
            input = params.input_size,
            "TorchScript detector ready"
        );
        Ok(Self {
            module,
            device,
            params,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn params(&self) -> &YoloParams {
        &self.params
    }
}

impl Detector for TorchDetector {
    fn name(&self) -> &'static str {
        "torchscript-yolov8"
    }

    fn detect(&mut self, bgr: &[u8], width: i32, height: i32) -> Result<Vec<Detection>> {
        let started = Instant::now();
        let side = self.params.input_size as i64;
        let input = yolo::bgr_to_chw(bgr, width, height, self.params.input_size)?;
        let tensor = Tensor::from_slice(&input)
            .view([1, 3, side, side])
            .to_device(self.device);

        let output = tch::no_grad(|| self.module.forward_ts(&[tensor]))?;
        let shape = output.size();
        if shape.len() != 3 {
            bail!("unexpected detector output shape: {shape:?}");
        }
        if shape[0] != 1 {
            bail!("detector expected batch=1 but received {}", shape[0]);
        }
        let channels = shape[1] as usize;
        let anchors = shape[2] as usize;

        let flat = output
            .to_device(Device::Cpu)
            .to_kind(Kind::Float)
            .contiguous()
            .view([-1]);
        let values = Vec::<f32>::try_from(&flat)?;

        let detections = yolo::decode(&values, channels, anchors, &self.params, (width, height))?;
        debug!(
            anchors,
            detections = detections.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "inference complete"
        );
        Ok(detections)
    }
}
