//! Request extractors shared by the handlers.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts, StatusCode},
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;
use crate::db::UserRecord;
use crate::session::Session;

/// A body accepted either as JSON or as an urlencoded form.
///
/// The form decoder is used when the content type says so; anything else is
/// read as JSON.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| Self(value))
                .map_err(|e| body_error(e.status(), e.body_text()))
        } else {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| Self(value))
                .map_err(|e| body_error(e.status(), e.body_text()))
        }
    }
}

fn body_error(status: StatusCode, text: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        tracing::debug!(status = %status, reason = %text, "Rejected request body");
        ApiError::BadRequest(text)
    }
}

/// The `{id}` path segment of post routes, as a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostId(pub i64);

impl<S> FromRequestParts<S> for PostId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::BadRequest("Invalid post id".into()))?;

        match raw.parse::<i64>() {
            Ok(id) if id > 0 => Ok(PostId(id)),
            _ => Err(ApiError::BadRequest("Invalid post id".into())),
        }
    }
}

/// The signed-in user, or a 401 before any body extractor runs.
#[derive(Debug, Clone)]
pub struct SignedIn(pub UserRecord);

impl<S> FromRequestParts<S> for SignedIn
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .and_then(Session::user)
            .cloned()
            .map(SignedIn)
            .ok_or_else(ApiError::login_required)
    }
}
