//! Typed repository over a [`Database`].
//!
//! Each operation builds one statement from the [`queries`] catalogue, logs it
//! together with its bound parameters, runs it and maps the rows to models.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::queries;
use crate::db::{Database, DbError, ExecResult, Row, Statement};
use crate::security::escape::{escape_html, HtmlEscape};

/// An account as exposed to the rest of the service (never the password).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
}

/// One entry of the post listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

/// A single post with its author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

/// A comment with its author.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
}

/// Input for [`BlogStore::create_post`].
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub image_path: Option<String>,
}

impl HtmlEscape for PostSummary {
    fn html_escaped(self) -> Self {
        Self {
            title: escape_html(&self.title),
            username: escape_html(&self.username),
            ..self
        }
    }
}

// image_path is generated server-side from a sanitized name and is left as is.
impl HtmlEscape for PostDetail {
    fn html_escaped(self) -> Self {
        Self {
            title: escape_html(&self.title),
            content: escape_html(&self.content),
            username: escape_html(&self.username),
            ..self
        }
    }
}

impl HtmlEscape for CommentView {
    fn html_escaped(self) -> Self {
        Self {
            content: escape_html(&self.content),
            username: escape_html(&self.username),
            ..self
        }
    }
}

/// Repository handle shared by all handlers.
#[derive(Clone)]
pub struct BlogStore {
    db: Arc<dyn Database>,
}

impl BlogStore {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    async fn query(&self, stmt: Statement) -> Result<Vec<Row>, DbError> {
        tracing::debug!(sql = stmt.sql(), params = ?stmt.params(), "Running query");
        self.db.query(&stmt).await
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbError> {
        tracing::debug!(sql = stmt.sql(), params = ?stmt.params(), "Running statement");
        let result = self.db.execute(&stmt).await?;
        tracing::debug!(affected_rows = result.affected_rows, "Statement applied");
        Ok(result)
    }

    async fn insert(&self, stmt: Statement) -> Result<i64, DbError> {
        self.execute(stmt)
            .await?
            .last_insert_id
            .ok_or_else(|| DbError::Column("insert returned no id".into()))
    }

    /// Create an account. Fails with `DuplicateEntry` when the name is taken.
    pub async fn register_user(&self, username: &str, password: &str) -> Result<i64, DbError> {
        self.insert(
            Statement::prepare(queries::INSERT_USER)
                .bind(username)
                .bind(password),
        )
        .await
    }

    /// Look up the account matching both username and password.
    pub async fn find_user_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, DbError> {
        let rows = self
            .query(
                Statement::prepare(queries::FIND_USER_BY_CREDENTIALS)
                    .bind(username)
                    .bind(password),
            )
            .await?;

        rows.first()
            .map(|row| -> Result<_, DbError> {
                Ok(UserRecord {
                    id: row.get_i64("id")?,
                    username: row.get_str("username")?.to_string(),
                })
            })
            .transpose()
    }

    /// All posts, newest first.
    pub async fn list_posts(&self) -> Result<Vec<PostSummary>, DbError> {
        let rows = self.query(Statement::prepare(queries::LIST_POSTS)).await?;
        rows.iter()
            .map(|row| -> Result<_, DbError> {
                Ok(PostSummary {
                    id: row.get_i64("id")?,
                    title: row.get_str("title")?.to_string(),
                    created_at: row.get_timestamp("created_at")?,
                    username: row.get_str("username")?.to_string(),
                })
            })
            .collect()
    }

    pub async fn find_post(&self, post_id: i64) -> Result<Option<PostDetail>, DbError> {
        let rows = self
            .query(Statement::prepare(queries::FIND_POST).bind(post_id))
            .await?;

        rows.first()
            .map(|row| -> Result<_, DbError> {
                Ok(PostDetail {
                    id: row.get_i64("id")?,
                    user_id: row.get_i64("user_id")?,
                    title: row.get_str("title")?.to_string(),
                    content: row.get_str("content")?.to_string(),
                    image_path: row.get_opt_str("image_path")?.map(str::to_string),
                    created_at: row.get_timestamp("created_at")?,
                    username: row.get_str("username")?.to_string(),
                })
            })
            .transpose()
    }

    /// Store a post as submitted (no escaping) and return its id.
    pub async fn create_post(&self, post: NewPost) -> Result<i64, DbError> {
        self.insert(
            Statement::prepare(queries::INSERT_POST)
                .bind(post.user_id)
                .bind(post.title)
                .bind(post.content)
                .bind(post.image_path),
        )
        .await
    }

    /// Comments of a post, oldest first.
    pub async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>, DbError> {
        let rows = self
            .query(Statement::prepare(queries::LIST_COMMENTS).bind(post_id))
            .await?;
        rows.iter()
            .map(|row| -> Result<_, DbError> {
                Ok(CommentView {
                    content: row.get_str("content")?.to_string(),
                    created_at: row.get_timestamp("created_at")?,
                    username: row.get_str("username")?.to_string(),
                })
            })
            .collect()
    }

    pub async fn create_comment(
        &self,
        post_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<i64, DbError> {
        self.insert(
            Statement::prepare(queries::INSERT_COMMENT)
                .bind(post_id)
                .bind(user_id)
                .bind(content),
        )
        .await
    }
}
