//! Prometheus metrics for the query gateway
//!
//! This module is only compiled when the `metrics` feature is enabled.
//!
//! Exposed metrics:
//! - `http_requests_total` - Counter for total HTTP requests
//! - `http_request_duration_seconds` - Histogram for request latencies
//! - `warehouse_operations_total` - Counter for schema/estimate/query/translate calls

use axum::{
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    /// Counter for total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// Histogram for HTTP request duration in seconds. Query execution can
    /// run for minutes, hence the long tail buckets.
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "path"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]
    )
    .unwrap();

    /// Counter for warehouse and translator operations
    pub static ref WAREHOUSE_OPERATIONS_TOTAL: CounterVec = register_counter_vec!(
        "warehouse_operations_total",
        "Total number of warehouse operations",
        &["operation", "status"]
    )
    .unwrap();
}

/// Label value for requests that matched no route.
const UNMATCHED_PATH: &str = "unmatched";

/// Route template for the `path` label, never the raw request URI.
fn path_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string())
}

/// Axum middleware to track HTTP request metrics
pub async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = path_label(req.extensions().get::<MatchedPath>());

    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Handler for the `/metrics` endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", encoder.format_type())],
            buffer,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Record a warehouse operation outcome
pub fn record_warehouse_operation(operation: &str, status: &str) {
    WAREHOUSE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}
