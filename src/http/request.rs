//! Request identification.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client sent none
//! - Echo it back on the response
//! - Expose it to the trace span of every request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing

use axum::{body::Body, http::Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer assigning `x-request-id` to incoming requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying `x-request-id` from the request onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Read the request id, if one has been assigned.
pub fn request_id<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span factory for `TraceLayer` carrying the request id.
pub fn make_request_span(req: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(req),
        method = %req.method(),
        path = %req.uri().path(),
    )
}
