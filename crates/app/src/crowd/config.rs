//! Command-line configuration.
//!
//! Defaults reproduce the stock deployment: camera 0, `yolov8n.torchscript`,
//! `0.0.0.0:8000`, JPEG quality 95. The person threshold and the frame
//! interval are constants, not flags.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

pub const DEFAULT_MODEL_PATH: &str = "yolov8n.torchscript";

/// Validated settings for a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrowdConfig {
    /// Camera index, `/dev/videoN`, or file/stream URI.
    pub source_uri: String,
    /// TorchScript YOLOv8 export.
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Requested capture resolution (width, height).
    pub capture_size: Option<(i32, i32)>,
    /// Square detector input side.
    pub detector_size: u32,
    pub jpeg_quality: u8,
    /// Force CPU inference.
    pub use_cpu: bool,
}

impl CrowdConfig {
    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// CLI arguments accepted by the service.
#[derive(Debug, Args)]
pub struct CrowdCliArgs {
    /// Camera index, `/dev/videoN`, or file/stream URI.
    #[arg(long = "source", value_name = "URI", default_value = "0")]
    pub source: String,
    /// TorchScript YOLOv8 model path.
    #[arg(long = "model", value_name = "PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,
    /// Address to bind the HTTP server to.
    #[arg(long = "host", value_name = "ADDR", default_value = "0.0.0.0")]
    pub host: String,
    /// Port to bind the HTTP server to.
    #[arg(long = "port", value_name = "PORT", default_value_t = 8000)]
    pub port: u16,
    /// Requested capture width in pixels.
    #[arg(long = "width", value_name = "PX", requires = "height")]
    pub width: Option<i32>,
    /// Requested capture height in pixels.
    #[arg(long = "height", value_name = "PX", requires = "width")]
    pub height: Option<i32>,
    /// Detector input side in pixels (multiple of 32).
    #[arg(long = "detector-size", value_name = "PX", default_value_t = 640)]
    pub detector_size: u32,
    /// JPEG quality of the streamed frames (1-100).
    #[arg(long = "jpeg-quality", value_name = "QUALITY", default_value_t = 95)]
    pub jpeg_quality: u8,
    /// Force CPU inference.
    #[arg(long = "cpu", action = clap::ArgAction::SetTrue)]
    pub use_cpu: bool,
}

impl TryFrom<CrowdCliArgs> for CrowdConfig {
    type Error = anyhow::Error;

    fn try_from(args: CrowdCliArgs) -> Result<Self> {
        if args.source.trim().is_empty() {
            bail!("--source must not be empty");
        }
        if args.port == 0 {
            bail!("--port must be between 1 and 65535");
        }

        let capture_size = match (args.width, args.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            (None, None) => None,
            _ => bail!("--width and --height must be given together as positive integers"),
        };

        if args.detector_size == 0 || args.detector_size % 32 != 0 {
            bail!("--detector-size must be a positive multiple of 32");
        }
        if !(1..=100).contains(&args.jpeg_quality) {
            bail!("--jpeg-quality must be an integer between 1 and 100");
        }

        Ok(Self {
            source_uri: args.source,
            model_path: args.model_path,
            host: args.host,
            port: args.port,
            capture_size,
            detector_size: args.detector_size,
            jpeg_quality: args.jpeg_quality,
            use_cpu: args.use_cpu,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CrowdCliArgs,
    }

    fn parse(argv: &[&str]) -> Result<CrowdConfig> {
        let cli = TestCli::try_parse_from(std::iter::once("crowd-density").chain(argv.iter().copied()))?;
        CrowdConfig::try_from(cli.args)
    }

    #[test]
    fn defaults_match_stock_deployment() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.source_uri, "0");
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.bind_addr(), ("0.0.0.0".to_string(), 8000));
        assert_eq!(config.capture_size, None);
        assert_eq!(config.detector_size, 640);
        assert_eq!(config.jpeg_quality, 95);
        assert!(!config.use_cpu);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--source",
            "/dev/video2",
            "--port",
            "9000",
            "--width",
            "1280",
            "--height",
            "720",
            "--detector-size",
            "320",
            "--jpeg-quality",
            "70",
            "--cpu",
        ])
        .unwrap();
        assert_eq!(config.source_uri, "/dev/video2");
        assert_eq!(config.port, 9000);
        assert_eq!(config.capture_size, Some((1280, 720)));
        assert_eq!(config.detector_size, 320);
        assert_eq!(config.jpeg_quality, 70);
        assert!(config.use_cpu);
    }

    #[test]
    fn width_requires_height() {
        assert!(parse(&["--width", "640"]).is_err());
    }

    #[test]
    fn rejects_non_positive_resolution() {
        assert!(parse(&["--width", "0", "--height", "480"]).is_err());
    }

    #[test]
    fn rejects_misaligned_detector_size() {
        assert!(parse(&["--detector-size", "650"]).is_err());
        assert!(parse(&["--detector-size", "0"]).is_err());
    }

    #[test]
    fn rejects_out_of_range_quality() {
        assert!(parse(&["--jpeg-quality", "0"]).is_err());
        assert!(parse(&["--jpeg-quality", "101"]).is_err());
    }

    #[test]
    fn rejects_port_zero() {
        assert!(parse(&["--port", "0"]).is_err());
    }
}
