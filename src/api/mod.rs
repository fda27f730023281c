//! JSON API.
//!
//! # Routes
//! ```text
//! POST /api/users/register        create account
//! POST /api/users/login           check credentials, issue session
//! POST /api/users/logout          drop session
//! GET  /api/users/me              current user
//! GET  /api/posts                 list (escaped)
//! POST /api/posts                 create (multipart, login required)
//! GET  /api/posts/{id}            detail (escaped)
//! GET  /api/posts/{id}/comments   list (escaped)
//! POST /api/posts/{id}/comments   create (login required)
//! ```

pub mod comments;
pub mod error;
pub mod extract;
pub mod posts;
pub mod users;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;

pub use error::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/register", post(users::register))
        .route("/api/users/login", post(users::login))
        .route("/api/users/logout", post(users::logout))
        .route("/api/users/me", get(users::me))
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/{id}", get(posts::get_post))
        .route(
            "/api/posts/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
}
