//! Tracing subscriber and Prometheus recorder setup.

use std::{sync::OnceLock, thread, time::Duration};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global tracing subscriber. Honours `RUST_LOG`, defaulting to
/// `info`. A second call is a no-op.
pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_filter(env_filter),
        )
        .with(tracing_error::ErrorLayer::default())
        .try_init();
}

/// Install the global metrics recorder once and return its render handle.
///
/// Returns `None` when another recorder was installed first; metrics are
/// then recorded there and `/metrics` answers 404.
pub(crate) fn init_metrics_recorder() -> Option<PrometheusHandle> {
    if let Some(handle) = PROM_HANDLE.get() {
        return Some(handle.clone());
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    if let Err(err) = metrics::set_global_recorder(recorder) {
        warn!("metrics recorder not installed: {err}");
        return None;
    }

    let upkeep_handle = handle.clone();
    if let Err(err) = thread::Builder::new()
        .name("prometheus-upkeep".into())
        .spawn(move || {
            loop {
                thread::sleep(Duration::from_secs(5));
                upkeep_handle.run_upkeep();
            }
        })
    {
        warn!("failed to spawn prometheus upkeep thread: {err}");
    }

    Some(PROM_HANDLE.get_or_init(|| handle).clone())
}
