//! Crowd-density service: captures frames, detects people, and serves an
//! annotated MJPEG feed plus the live density over HTTP.
//!
//! - `config`: CLI configuration parsing.
//! - `pipeline`: Wires backends, state, server, and shutdown together.
//! - `processing`: The per-frame loop exposed as a stream.
//! - `density`: Person filtering and the occupancy ratio.
//! - `annotation`: Box, label, and overlay drawing.
//! - `encoding`: JPEG encoding and multipart framing.
//! - `still`: Person count and density of an uploaded image.
//! - `server`: Actix Web endpoints.
//! - `lifecycle`: Stop signal handling and device release.
//! - `state`: Shared context passed to every stage.
//! - `telemetry`: Tracing subscriber and metrics recorder.
//! - `backends`: Feature-gated camera and detector constructors.

pub use config::{CrowdCliArgs, CrowdConfig};
pub use pipeline::run;

pub mod annotation;
mod backends;
pub mod config;
pub mod density;
pub mod encoding;
pub mod lifecycle;
mod pipeline;
pub mod processing;
#[cfg(feature = "with-tch")]
mod runtime;
pub mod server;
pub mod state;
pub mod still;
mod telemetry;
