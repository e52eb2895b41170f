//! Prometheus metrics middleware.
//!
//! Provides HTTP request/response metrics plus guest import counters.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::ImportOutcome;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_to_str(req.method());
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    counter!(
        "http_requests_total",
        "method" => method,
        "path" => path.clone(),
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// Records the counters for one finished import request.
pub fn record_import_outcome(endpoint: &'static str, outcome: &ImportOutcome) {
    counter!("guest_import_households_created_total", "endpoint" => endpoint)
        .increment(u64::from(outcome.processed.households));
    counter!("guest_import_guests_created_total", "endpoint" => endpoint)
        .increment(u64::from(outcome.processed.guests));
    counter!("guest_import_duplicates_total", "endpoint" => endpoint)
        .increment(u64::from(outcome.skipped.duplicates));
    record_invalid_rows(endpoint, outcome.skipped.invalid_rows);
    counter!("guest_import_failed_rows_total", "endpoint" => endpoint)
        .increment(outcome.failed_count() as u64);
}

/// Records rows dropped for lacking a name or household.
pub fn record_invalid_rows(endpoint: &'static str, count: u32) {
    counter!("guest_import_invalid_rows_total", "endpoint" => endpoint)
        .increment(u64::from(count));
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Installs the global Prometheus recorder.
///
/// Call once during startup, before any metrics are recorded. A second call
/// keeps the first recorder.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::warn!("Prometheus recorder already installed");
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 15.0, 60.0])?
        .install_recorder()?;

    // Lost race with a concurrent init; the earlier handle stays.
    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(())
}
