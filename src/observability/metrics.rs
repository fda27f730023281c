//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blog_requests_total` (counter): requests by method, route, status
//! - `blog_request_duration_seconds` (histogram): latency distribution
//! - `blog_login_failures_total` (counter): rejected credential checks
//! - `blog_traversal_blocked_total` (counter): file requests refused by containment, by area
//! - `blog_sessions_active` (gauge): live sessions
//!
//! Without an installed recorder every call is a no-op, so tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("blog_requests_total", &labels).increment(1);
    metrics::histogram!("blog_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_login_failure() {
    metrics::counter!("blog_login_failures_total").increment(1);
}

pub fn record_traversal_blocked(area: &'static str) {
    metrics::counter!("blog_traversal_blocked_total", "area" => area).increment(1);
}

pub fn record_sessions_active(count: usize) {
    metrics::gauge!("blog_sessions_active").set(count as f64);
}

/// Middleware recording request count and latency per matched route.
pub async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    record_request(&method, &route, response.status().as_u16(), start);
    response
}
