//! Account and session endpoints.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::extract::JsonOrForm;
use crate::db::{DbError, UserRecord};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::session::Session;

const MAX_USERNAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::BadRequest("Username and password are required".into()));
        }
        if self.username.chars().count() > MAX_USERNAME_LEN {
            return Err(ApiError::BadRequest(format!(
                "Username must be at most {} characters",
                MAX_USERNAME_LEN
            )));
        }
        Ok(())
    }
}

/// `POST /api/users/register`
pub async fn register(
    State(state): State<AppState>,
    JsonOrForm(creds): JsonOrForm<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    creds.validate()?;

    match state.store.register_user(&creds.username, &creds.password).await {
        Ok(user_id) => {
            tracing::info!(user_id, "User registered");
            Ok((StatusCode::CREATED, Json(json!({ "message": "Registration successful" }))))
        }
        Err(DbError::DuplicateEntry(_)) => {
            Err(ApiError::BadRequest("Username already exists".into()))
        }
        Err(e) => Err(ApiError::internal("Registration failed", e)),
    }
}

/// `POST /api/users/login`
///
/// Credentials are matched by a parameterized lookup. On success the
/// presented session (if any) is discarded and a fresh id is issued.
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    JsonOrForm(creds): JsonOrForm<Credentials>,
) -> Result<Response, ApiError> {
    creds.validate()?;

    let user = state
        .store
        .find_user_by_credentials(&creds.username, &creds.password)
        .await
        .map_err(|e| ApiError::internal("Login failed", e))?;

    let Some(user) = user else {
        metrics::record_login_failure();
        tracing::warn!(username = %creds.username, "Login rejected");
        return Err(ApiError::Unauthorized("Invalid username or password"));
    };

    let session_id = state.sessions.rotate(session.id(), user.clone());
    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        [(header::SET_COOKIE, state.sessions.cookie().issue(&session_id))],
        Json(json!({ "message": "Login successful", "user": user })),
    )
        .into_response())
}

/// `POST /api/users/logout`
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    if let Some(id) = session.id() {
        state.sessions.remove(id);
    }

    (
        [(header::SET_COOKIE, state.sessions.cookie().clear())],
        Json(json!({ "message": "Logout successful" })),
    )
        .into_response()
}

/// `GET /api/users/me`
pub async fn me(Extension(session): Extension<Session>) -> Result<Json<UserRecord>, ApiError> {
    session
        .user()
        .cloned()
        .map(Json)
        .ok_or_else(ApiError::login_required)
}
