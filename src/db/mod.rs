//! Relational storage subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → store.rs (typed repository: builds a Statement per operation)
//!     → statement.rs (SQL text + bound parameters, validated)
//!     → dyn Database (executes the statement)
//!         → memory.rs (in-process tables)
//!     → Row → model
//! ```
//!
//! # Design Decisions
//! - The database is reached only through parameterized statements
//! - One statement per execution; stacked statements are refused
//! - Backends are swappable behind the `Database` trait

pub mod memory;
pub mod queries;
pub mod statement;
pub mod store;

use async_trait::async_trait;

pub use memory::MemoryDatabase;
pub use statement::{Row, SqlValue, Statement, StatementError};
pub use store::{BlogStore, CommentView, NewPost, PostDetail, PostSummary, UserRecord};

/// Errors surfaced by a [`Database`] backend.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("invalid statement: {0}")]
    InvalidStatement(#[from] StatementError),
    #[error("statement not supported by this backend: {0}")]
    UnsupportedStatement(String),
    #[error("duplicate entry for {0}")]
    DuplicateEntry(&'static str),
    #[error("foreign key constraint failed: {0}")]
    ForeignKey(&'static str),
    #[error("column error: {0}")]
    Column(String),
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a data-modifying statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub affected_rows: u64,
    pub last_insert_id: Option<i64>,
}

/// A relational store reachable through parameterized statements.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement that returns rows.
    async fn query(&self, stmt: &Statement) -> Result<Vec<Row>, DbError>;

    /// Run a statement that modifies data.
    async fn execute(&self, stmt: &Statement) -> Result<ExecResult, DbError>;
}
