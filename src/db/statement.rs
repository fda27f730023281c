//! Parameterized statements and result rows.
//!
//! A [`Statement`] pairs SQL text with positional `?` parameters. The text is a
//! `&'static str`, so it is always a literal written into the binary. Request
//! data can only arrive as a bound [`SqlValue`], never as SQL.

use chrono::{DateTime, Utc};

use crate::db::DbError;

/// A value bound to a placeholder or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Why a statement was refused before reaching the database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatementError {
    #[error("statement has {placeholders} placeholders but {bound} bound parameters")]
    PlaceholderMismatch { placeholders: usize, bound: usize },
    #[error("statement text contains more than one statement")]
    MultipleStatements,
    #[error("statement text has an unterminated quoted literal")]
    UnterminatedLiteral,
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: &'static str,
    params: Vec<SqlValue>,
}

impl Statement {
    pub fn prepare(sql: &'static str) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    /// Bind the next positional parameter.
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &'static str {
        self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Check the statement is a single statement with one bound value per `?`.
    ///
    /// Characters inside quoted literals are skipped, so a `?` or `;` inside
    /// `'...'`, `"..."` or `` `...` `` does not count. A trailing `;` is allowed.
    pub fn validate(&self) -> Result<(), StatementError> {
        let mut placeholders = 0;
        let mut quote: Option<char> = None;
        let mut terminated = false;

        for ch in self.sql.chars() {
            if let Some(q) = quote {
                if ch == q {
                    quote = None;
                }
                continue;
            }
            if terminated && !ch.is_whitespace() {
                return Err(StatementError::MultipleStatements);
            }
            match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '?' => placeholders += 1,
                ';' => terminated = true,
                _ => {}
            }
        }

        if quote.is_some() {
            return Err(StatementError::UnterminatedLiteral);
        }
        if placeholders != self.params.len() {
            return Err(StatementError::PlaceholderMismatch {
                placeholders,
                bound: self.params.len(),
            });
        }
        Ok(())
    }
}

/// A result row, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.columns.push((column.into(), value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    fn require(&self, column: &str) -> Result<&SqlValue, DbError> {
        self.get(column)
            .ok_or_else(|| DbError::Column(format!("missing column '{}'", column)))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, DbError> {
        match self.require(column)? {
            SqlValue::Int(v) => Ok(*v),
            other => Err(type_error(column, "integer", other)),
        }
    }

    pub fn get_str(&self, column: &str) -> Result<&str, DbError> {
        match self.require(column)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(type_error(column, "text", other)),
        }
    }

    pub fn get_opt_str(&self, column: &str) -> Result<Option<&str>, DbError> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(v) => Ok(Some(v)),
            other => Err(type_error(column, "nullable text", other)),
        }
    }

    pub fn get_timestamp(&self, column: &str) -> Result<DateTime<Utc>, DbError> {
        match self.require(column)? {
            SqlValue::Timestamp(v) => Ok(*v),
            other => Err(type_error(column, "timestamp", other)),
        }
    }
}

fn type_error(column: &str, expected: &str, found: &SqlValue) -> DbError {
    DbError::Column(format!("column '{}' expected {}, found {:?}", column, expected, found))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_must_match_bound_values() {
        let stmt = Statement::prepare("SELECT * FROM users WHERE username = ? AND password = ?")
            .bind("alice");
        assert_eq!(
            stmt.validate(),
            Err(StatementError::PlaceholderMismatch { placeholders: 2, bound: 1 })
        );
        assert!(stmt.bind("secret").validate().is_ok());
    }

    #[test]
    fn test_quoted_question_marks_are_not_placeholders() {
        let stmt = Statement::prepare("SELECT '?' AS q, `we?rd` FROM t WHERE id = ?").bind(1_i64);
        assert!(stmt.validate().is_ok());
    }

    #[test]
    fn test_stacked_statements_are_refused() {
        let stmt = Statement::prepare("SELECT 1; DROP TABLE users");
        assert_eq!(stmt.validate(), Err(StatementError::MultipleStatements));

        assert!(Statement::prepare("SELECT 1;  \n").validate().is_ok());
        assert!(Statement::prepare("SELECT ';' AS semi").validate().is_ok());
    }

    #[test]
    fn test_unterminated_literal() {
        assert_eq!(
            Statement::prepare("SELECT 'oops").validate(),
            Err(StatementError::UnterminatedLiteral)
        );
    }

    #[test]
    fn test_injection_payload_stays_a_value() {
        let payload = "' OR '1'='1' -- ";
        let stmt = Statement::prepare("SELECT * FROM users WHERE username = ?").bind(payload);
        assert!(stmt.validate().is_ok());
        assert_eq!(stmt.params(), &[SqlValue::Text(payload.to_string())]);
        assert!(!stmt.sql().contains("OR"));
    }

    #[test]
    fn test_row_getters() {
        let row = Row::new()
            .with("id", 7_i64)
            .with("title", "hi")
            .with("image_path", None::<String>);

        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_str("title").unwrap(), "hi");
        assert_eq!(row.get_opt_str("image_path").unwrap(), None);
        assert!(matches!(row.get_str("id"), Err(DbError::Column(_))));
        assert!(matches!(row.get_i64("nope"), Err(DbError::Column(_))));
    }
}
