//! In-process implementation of [`Database`].
//!
//! Holds the `users`, `posts` and `comments` tables in memory and executes
//! the statements of the [`queries`] catalogue against them, reading values
//! only from bound parameters. Constraints mirror the relational schema:
//! unique usernames and foreign keys from posts/comments to their parents.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::queries;
use crate::db::{Database, DbError, ExecResult, Row, SqlValue, Statement};

struct UserRow {
    id: i64,
    username: String,
    password: String,
}

struct PostRow {
    id: i64,
    user_id: i64,
    title: String,
    content: String,
    image_path: Option<String>,
    created_at: DateTime<Utc>,
}

struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserRow>,
    posts: Vec<PostRow>,
    comments: Vec<CommentRow>,
    next_user_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
}

impl Tables {
    fn username_of(&self, user_id: i64) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.username.as_str())
    }
}

/// Tables kept in process memory.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `DbError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), DbError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(DbError::Unavailable("memory database is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn query(&self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        self.check_online()?;
        stmt.validate()?;
        let params = Params(stmt.params());
        let tables = self
            .tables
            .lock()
            .map_err(|_| DbError::Unavailable("table lock poisoned".into()))?;

        match stmt.sql() {
            queries::FIND_USER_BY_CREDENTIALS => {
                let username = params.text(0)?;
                let password = params.text(1)?;
                Ok(tables
                    .users
                    .iter()
                    .filter(|u| u.username == username && u.password == password)
                    .map(|u| Row::new().with("id", u.id).with("username", u.username.as_str()))
                    .collect())
            }
            queries::LIST_POSTS => {
                let mut posts: Vec<&PostRow> = tables.posts.iter().collect();
                posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
                Ok(posts
                    .into_iter()
                    .filter_map(|p| {
                        let username = tables.username_of(p.user_id)?;
                        Some(
                            Row::new()
                                .with("id", p.id)
                                .with("title", p.title.as_str())
                                .with("created_at", p.created_at)
                                .with("username", username),
                        )
                    })
                    .collect())
            }
            queries::FIND_POST => {
                let post_id = params.int(0)?;
                Ok(tables
                    .posts
                    .iter()
                    .filter(|p| p.id == post_id)
                    .filter_map(|p| {
                        let username = tables.username_of(p.user_id)?;
                        Some(
                            Row::new()
                                .with("id", p.id)
                                .with("user_id", p.user_id)
                                .with("title", p.title.as_str())
                                .with("content", p.content.as_str())
                                .with("image_path", p.image_path.clone())
                                .with("created_at", p.created_at)
                                .with("username", username),
                        )
                    })
                    .collect())
            }
            queries::LIST_COMMENTS => {
                let post_id = params.int(0)?;
                let mut comments: Vec<&CommentRow> =
                    tables.comments.iter().filter(|c| c.post_id == post_id).collect();
                comments.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
                Ok(comments
                    .into_iter()
                    .filter_map(|c| {
                        let username = tables.username_of(c.user_id)?;
                        Some(
                            Row::new()
                                .with("content", c.content.as_str())
                                .with("created_at", c.created_at)
                                .with("username", username),
                        )
                    })
                    .collect())
            }
            other => Err(DbError::UnsupportedStatement(other.to_string())),
        }
    }

    async fn execute(&self, stmt: &Statement) -> Result<ExecResult, DbError> {
        self.check_online()?;
        stmt.validate()?;
        let params = Params(stmt.params());
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DbError::Unavailable("table lock poisoned".into()))?;

        let id = match stmt.sql() {
            queries::INSERT_USER => {
                let username = params.text(0)?;
                let password = params.text(1)?;
                if tables.users.iter().any(|u| u.username == username) {
                    return Err(DbError::DuplicateEntry("users.username"));
                }
                tables.next_user_id += 1;
                let id = tables.next_user_id;
                tables.users.push(UserRow {
                    id,
                    username: username.to_string(),
                    password: password.to_string(),
                });
                id
            }
            queries::INSERT_POST => {
                let user_id = params.int(0)?;
                let title = params.text(1)?;
                let content = params.text(2)?;
                let image_path = params.opt_text(3)?;
                if tables.username_of(user_id).is_none() {
                    return Err(DbError::ForeignKey("posts.user_id"));
                }
                tables.next_post_id += 1;
                let id = tables.next_post_id;
                tables.posts.push(PostRow {
                    id,
                    user_id,
                    title: title.to_string(),
                    content: content.to_string(),
                    image_path: image_path.map(str::to_string),
                    created_at: Utc::now(),
                });
                id
            }
            queries::INSERT_COMMENT => {
                let post_id = params.int(0)?;
                let user_id = params.int(1)?;
                let content = params.text(2)?;
                if !tables.posts.iter().any(|p| p.id == post_id) {
                    return Err(DbError::ForeignKey("comments.post_id"));
                }
                if tables.username_of(user_id).is_none() {
                    return Err(DbError::ForeignKey("comments.user_id"));
                }
                tables.next_comment_id += 1;
                let id = tables.next_comment_id;
                tables.comments.push(CommentRow {
                    id,
                    post_id,
                    user_id,
                    content: content.to_string(),
                    created_at: Utc::now(),
                });
                id
            }
            other => return Err(DbError::UnsupportedStatement(other.to_string())),
        };

        Ok(ExecResult {
            affected_rows: 1,
            last_insert_id: Some(id),
        })
    }
}

/// Typed access to positional parameters.
struct Params<'a>(&'a [SqlValue]);

impl<'a> Params<'a> {
    fn get(&self, idx: usize) -> Result<&'a SqlValue, DbError> {
        self.0
            .get(idx)
            .ok_or_else(|| DbError::Column(format!("parameter {} is not bound", idx + 1)))
    }

    fn text(&self, idx: usize) -> Result<&'a str, DbError> {
        match self.get(idx)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(param_error(idx, "text", other)),
        }
    }

    fn opt_text(&self, idx: usize) -> Result<Option<&'a str>, DbError> {
        match self.get(idx)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(v) => Ok(Some(v)),
            other => Err(param_error(idx, "nullable text", other)),
        }
    }

    fn int(&self, idx: usize) -> Result<i64, DbError> {
        match self.get(idx)? {
            SqlValue::Int(v) => Ok(*v),
            other => Err(param_error(idx, "integer", other)),
        }
    }
}

fn param_error(idx: usize, expected: &str, found: &SqlValue) -> DbError {
    DbError::Column(format!("parameter {} expected {}, found {:?}", idx + 1, expected, found))
}
