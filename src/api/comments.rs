//! Comment endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::extract::{JsonOrForm, PostId, SignedIn};
use crate::db::{CommentView, DbError};
use crate::http::server::AppState;
use crate::security::escape::HtmlEscape;

#[derive(Debug, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub content: String,
}

/// `GET /api/posts/{id}/comments`
pub async fn list_comments(
    State(state): State<AppState>,
    PostId(post_id): PostId,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let comments = state
        .store
        .list_comments(post_id)
        .await
        .map_err(|e| ApiError::internal("Failed to load comments", e))?;
    Ok(Json(comments.html_escaped()))
}

/// `POST /api/posts/{id}/comments`
pub async fn create_comment(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
    PostId(post_id): PostId,
    JsonOrForm(comment): JsonOrForm<NewComment>,
) -> Result<impl IntoResponse, ApiError> {
    if comment.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Comment content is required".into()));
    }

    match state.store.create_comment(post_id, user.id, &comment.content).await {
        Ok(comment_id) => {
            tracing::info!(comment_id, post_id, user_id = user.id, "Comment created");
            Ok((StatusCode::CREATED, Json(json!({ "message": "Comment created" }))))
        }
        Err(DbError::ForeignKey(_)) => Err(ApiError::NotFound("Post not found")),
        Err(e) => Err(ApiError::internal("Failed to create comment", e)),
    }
}
