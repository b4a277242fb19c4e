//! Actix Web surface: the page, the MJPEG feed, the density value, still
//! image uploads, and Prometheus metrics.

use std::{net::TcpListener, sync::Arc};

use actix_web::{
    App, HttpResponse, HttpServer,
    http::header,
    web::{self, ServiceConfig},
};
use anyhow::{Context, Result};
use futures::TryStreamExt;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{error, info};

use crate::crowd::{
    encoding::MULTIPART_CONTENT_TYPE,
    processing::frame_stream,
    state::AppContext,
    still::{MAX_UPLOAD_BYTES, StillImageError, analyze_still},
};

/// Seconds actix waits for open connections after a graceful stop. Streams
/// end on their own within one frame interval of the stop signal.
const SHUTDOWN_TIMEOUT_SECS: u64 = 2;

#[derive(Debug, Serialize, PartialEq)]
pub struct DensityResponse {
    pub density: f64,
}

/// Register every route. Handlers expect `web::Data<AppContext>` and,
/// optionally, `web::Data<PrometheusHandle>`.
pub fn routes(cfg: &mut ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .route("/", web::get().to(index_route))
        .route("/video_feed", web::get().to(video_feed_handler))
        .route("/density", web::get().to(density_handler))
        .route("/upload", web::post().to(upload_handler))
        .route("/metrics", web::get().to(metrics_handler));
}

/// Serve until the context's stop signal fires, then stop gracefully.
pub(crate) async fn serve(
    context: Arc<AppContext>,
    bind: (String, u16),
    metrics: Option<PrometheusHandle>,
) -> Result<()> {
    let bind_label = format!("{}:{}", bind.0, bind.1);
    let listener = TcpListener::bind((bind.0.as_str(), bind.1))
        .with_context(|| format!("Failed to bind HTTP server to {bind_label}"))?;
    serve_listener(context, listener, metrics).await
}

/// [`serve`] on an already bound listener.
pub(crate) async fn serve_listener(
    context: Arc<AppContext>,
    listener: TcpListener,
    metrics: Option<PrometheusHandle>,
) -> Result<()> {
    let data = web::Data::from(context.clone());
    let metrics = metrics.map(web::Data::new);
    let local_addr = listener
        .local_addr()
        .context("HTTP listener has no local address")?;

    let server = HttpServer::new(move || {
        let app = App::new().app_data(data.clone()).configure(routes);
        match metrics.clone() {
            Some(handle) => app.app_data(handle),
            None => app,
        }
    })
    .disable_signals()
    .shutdown_timeout(SHUTDOWN_TIMEOUT_SECS)
    .listen(listener)
    .with_context(|| format!("Failed to listen on {local_addr}"))?
    .run();

    info!("serving on http://{local_addr} (/, /video_feed, /density, /upload, /metrics)");

    let handle = server.handle();
    let stop = context.stop_signal().clone();
    actix_web::rt::spawn(async move {
        stop.wait().await;
        info!("stop requested; shutting down HTTP server");
        handle.stop(true).await;
    });

    server.await.context("HTTP server error")
}

/// Serve the embedded HTML page.
async fn index_route() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(crate::html::index::INDEX_HTML)
}

/// Stream annotated frames as `multipart/x-mixed-replace`.
async fn video_feed_handler(context: web::Data<AppContext>) -> HttpResponse {
    let stream = frame_stream(context.into_inner()).inspect_err(|err| {
        metrics::counter!("crowd_stream_errors_total").increment(1);
        error!("frame stream ended: {err}");
    });

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

/// Return the most recently computed density.
async fn density_handler(context: web::Data<AppContext>) -> HttpResponse {
    HttpResponse::Ok().json(DensityResponse {
        density: context.density().load(),
    })
}

/// Count the people in a posted JPEG or PNG body.
async fn upload_handler(
    context: web::Data<AppContext>,
    body: web::Bytes,
) -> Result<HttpResponse, StillImageError> {
    let report = analyze_still(&context, &body)?;
    Ok(HttpResponse::Ok().json(report))
}

/// Prometheus text exposition, when a recorder is installed.
async fn metrics_handler(handle: Option<web::Data<PrometheusHandle>>) -> HttpResponse {
    match handle {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::NotFound().finish(),
    }
}
