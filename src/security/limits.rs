//! Request size limits.
//!
//! Bodies larger than the configured maximum are rejected with
//! 413 Payload Too Large before a handler buffers them.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Cap request bodies at `max_body_size` bytes.
///
/// `DefaultBodyLimit` raises the extractor limit (JSON, form, multipart) to the
/// same value so the two limits never disagree.
pub fn with_body_limit<S>(router: Router<S>, max_body_size: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(RequestBodyLimitLayer::new(max_body_size))
}
