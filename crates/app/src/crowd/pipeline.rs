//! Service supervisor: wires backends, shared state, the HTTP server, and
//! the shutdown protocol together.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::crowd::{
    backends::{load_detector, open_capture},
    config::CrowdConfig,
    lifecycle::Lifecycle,
    server::serve,
    state::{AppContext, StreamSettings},
    telemetry,
};

/// Run the service until SIGINT/SIGTERM, then shut down gracefully.
///
/// The capture device is released exactly once, after the server has
/// stopped or on any early error.
pub fn run(config: CrowdConfig) -> Result<()> {
    telemetry::init_tracing();
    let metrics = telemetry::init_metrics_recorder();

    let span = tracing::info_span!(
        "crowd",
        source = %config.source_uri,
        model = %config.model_path.display(),
        port = config.port,
    );
    let _span_guard = span.enter();

    let capture = open_capture(&config)?;
    let detector = match load_detector(&config) {
        Ok(detector) => detector,
        Err(err) => {
            capture.release();
            return Err(err);
        }
    };

    let context = Arc::new(AppContext::new(
        capture,
        detector,
        StreamSettings {
            jpeg_quality: config.jpeg_quality,
        },
    ));
    info!(detector = context.detector_name(), "pipeline ready");

    let lifecycle = Lifecycle::new(context.clone());
    let _release = lifecycle.release_guard();
    lifecycle.install_signal_handler()?;

    actix_web::rt::System::new()
        .block_on(serve(context, config.bind_addr(), metrics))
        .context("HTTP server terminated abnormally")?;

    lifecycle.release_capture();
    info!("shutdown complete");
    Ok(())
}
