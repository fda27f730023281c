//! Post endpoints.

use std::path::Path;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::api::error::ApiError;
use crate::api::extract::{PostId, SignedIn};
use crate::db::{NewPost, PostDetail, PostSummary};
use crate::http::server::AppState;
use crate::security::escape::HtmlEscape;
use crate::security::path::{resolve_within, sanitize_upload_name, PathError};

/// `GET /api/posts`
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostSummary>>, ApiError> {
    let posts = state
        .store
        .list_posts()
        .await
        .map_err(|e| ApiError::internal("Failed to load posts", e))?;
    Ok(Json(posts.html_escaped()))
}

/// `GET /api/posts/{id}`
pub async fn get_post(
    State(state): State<AppState>,
    PostId(post_id): PostId,
) -> Result<Json<PostDetail>, ApiError> {
    state
        .store
        .find_post(post_id)
        .await
        .map_err(|e| ApiError::internal("Failed to load post", e))?
        .map(|post| Json(post.html_escaped()))
        .ok_or(ApiError::NotFound("Post not found"))
}

/// An image part read from the multipart body, not yet written to disk.
struct PendingImage {
    file_name: String,
    bytes: Vec<u8>,
}

/// `POST /api/posts` (multipart: `title`, `content`, optional `image`)
pub async fn create_post(
    State(state): State<AppState>,
    SignedIn(user): SignedIn,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let max_upload = state.config.security.max_upload_size;

    let mut title = None;
    let mut content = None;
    let mut image = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => title = Some(field.text().await.map_err(multipart_error)?),
            Some("content") => content = Some(field.text().await.map_err(multipart_error)?),
            Some("image") => {
                // Browsers send an unnamed part when no file was chosen.
                let file_name = field.file_name().unwrap_or_default().to_string();
                if file_name.is_empty() {
                    continue;
                }
                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    if bytes.len() + chunk.len() > max_upload {
                        return Err(ApiError::PayloadTooLarge);
                    }
                    bytes.extend_from_slice(&chunk);
                }
                image = Some(PendingImage { file_name, bytes });
            }
            _ => {}
        }
    }

    let (title, content) = match (title, content) {
        (Some(t), Some(c)) if !t.trim().is_empty() && !c.trim().is_empty() => (t, c),
        _ => return Err(ApiError::BadRequest("Title and content are required".into())),
    };

    let stored = match image {
        Some(image) => Some(store_image(&state, image).await?),
        None => None,
    };

    let new_post = NewPost {
        user_id: user.id,
        title,
        content,
        image_path: stored.as_ref().map(|name| format!("uploads/{}", name)),
    };

    match state.store.create_post(new_post).await {
        Ok(post_id) => {
            tracing::info!(post_id, user_id = user.id, image = ?stored, "Post created");
            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": "Post created", "postId": post_id })),
            ))
        }
        Err(e) => {
            if let Some(name) = stored {
                discard_image(&state, &name).await;
            }
            Err(ApiError::internal("Failed to create post", e))
        }
    }
}

/// Write an uploaded image under the uploads directory and return its stored name.
async fn store_image(state: &AppState, image: PendingImage) -> Result<String, ApiError> {
    let security = &state.config.security;
    let name = sanitize_upload_name(&image.file_name, &security.allowed_image_extensions)
        .map_err(|e| {
            tracing::warn!(file_name = %image.file_name, error = %e, "Upload rejected");
            match e {
                PathError::DisallowedExtension(ext) => {
                    ApiError::BadRequest(format!("Image type '{}' is not allowed", ext))
                }
                _ => ApiError::BadRequest("Invalid image file name".into()),
            }
        })?;

    if image.bytes.is_empty() {
        return Err(ApiError::BadRequest("Image file is empty".into()));
    }

    let uploads_dir = Path::new(&state.config.storage.uploads_dir);
    let target = resolve_within(uploads_dir, &name).map_err(|e| {
        tracing::warn!(file_name = %image.file_name, error = %e, "Upload path escaped uploads dir");
        ApiError::BadRequest("Invalid image file name".into())
    })?;

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| ApiError::internal("Failed to create post", e))?;
    tokio::fs::write(target.path(), &image.bytes)
        .await
        .map_err(|e| ApiError::internal("Failed to create post", e))?;

    tracing::debug!(path = %target.path().display(), size = image.bytes.len(), "Image stored");
    Ok(name)
}

async fn discard_image(state: &AppState, name: &str) {
    let uploads_dir = Path::new(&state.config.storage.uploads_dir);
    if let Ok(target) = resolve_within(uploads_dir, name) {
        if let Err(e) = tokio::fs::remove_file(target.path()).await {
            tracing::warn!(error = %e, "Failed to remove orphaned upload");
        }
    }
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(e.body_text())
    }
}
