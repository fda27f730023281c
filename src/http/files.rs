//! Static asset and upload serving.
//!
//! # Responsibilities
//! - Serve `GET /` and `GET /{filename}` from the public directory
//! - Serve `GET /uploads/{filename}` from the uploads directory
//! - Refuse names that resolve outside their directory (403)
//! - Hide dotfiles, directories and missing files behind a uniform 404
//!
//! # Design Decisions
//! - The file name arrives percent-decoded, so `..%2F` is checked as `../`
//! - Lexical containment runs before any filesystem access; the canonical
//!   re-check afterwards catches symlinks that point out of the directory

use std::path::Path;

use axum::{
    body::Body,
    extract::{Path as UrlPath, Request, State},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::api::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::path::{resolve_within, PathError};

const FILE_NOT_FOUND: &str = "File not found";

/// `GET /`
pub async fn index(State(state): State<AppState>, req: Request) -> Response {
    let base = Path::new(&state.config.storage.public_dir);
    serve_contained(base, "index.html", "public", req)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// `GET /{filename}`
pub async fn public_file(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
    req: Request,
) -> Response {
    let base = Path::new(&state.config.storage.public_dir);
    serve_contained(base, &filename, "public", req)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// `GET /uploads/{filename}`
pub async fn upload_file(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
    req: Request,
) -> Response {
    let base = Path::new(&state.config.storage.uploads_dir);
    serve_contained(base, &filename, "uploads", req)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// Fallback for every unrouted request.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Page not found")
}

async fn serve_contained(
    base: &Path,
    requested: &str,
    area: &'static str,
    req: Request,
) -> Result<Response, ApiError> {
    tracing::debug!(area, requested, "File request");

    let contained = resolve_within(base, requested).map_err(|e| match e {
        PathError::Io(e) => ApiError::internal("Internal server error", e),
        other => blocked(area, requested, &other),
    })?;

    if contained.is_base() || contained.has_hidden_component() {
        return Err(ApiError::NotFound(FILE_NOT_FOUND));
    }

    let real = contained.ensure_canonical().await.map_err(|e| match e {
        PathError::Traversal(_) => blocked(area, requested, &e),
        _ => ApiError::NotFound(FILE_NOT_FOUND),
    })?;

    let is_file = tokio::fs::metadata(&real)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ApiError::NotFound(FILE_NOT_FOUND));
    }

    tracing::debug!(area, path = %real.display(), "Serving file");
    match ServeFile::new(&real).oneshot(req).await {
        Ok(response) => Ok(response.map(Body::new)),
        Err(never) => match never {},
    }
}

fn blocked(area: &'static str, requested: &str, reason: &PathError) -> ApiError {
    tracing::warn!(area, requested, reason = %reason, "Path traversal attempt blocked");
    metrics::record_traversal_blocked(area);
    ApiError::Forbidden
}
