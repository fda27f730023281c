//! API error type.
//!
//! Every failure leaves the service as `{"message": "..."}` with a matching
//! status code. Internal details are logged, never returned to the client.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Access denied")]
    Forbidden,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("Payload too large")]
    PayloadTooLarge,
    #[error("Request timed out")]
    Timeout,
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Log `cause` and produce a 500 carrying only `message`.
    pub fn internal(message: &'static str, cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "{}", message);
        ApiError::Internal(message)
    }

    pub fn login_required() -> Self {
        ApiError::Unauthorized("Login required")
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Give plain-text rejections from tower layers (body limit, timeout) the
/// same `{"message"}` body as handler errors. Other headers are kept.
pub async fn json_error_bodies(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        return response;
    }

    let error = match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
        StatusCode::REQUEST_TIMEOUT => ApiError::Timeout,
        _ => return response,
    };

    let mut replacement = error.into_response();
    for (name, value) in response.headers() {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        if !replacement.headers().contains_key(name) {
            replacement.headers_mut().insert(name.clone(), value.clone());
        }
    }
    replacement
}
