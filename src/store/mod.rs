//! Storage backends executing built queries and returning rows as JSON maps keyed by column.

mod postgres;
mod sqlite;

pub use postgres::{ensure_database_exists, PgStore};
pub use sqlite::SqliteStore;

use crate::error::AppError;
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One fetched row, keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

#[async_trait]
pub trait Store: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Row>, AppError>;

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError>;

    /// Runs a statement without parameters, e.g. DDL.
    async fn execute_raw(&self, sql: &str) -> Result<(), AppError>;

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Row>, AppError> {
        Ok(self.fetch_all(q).await?.into_iter().next())
    }

    async fn fetch_count(&self, q: &QueryBuf) -> Result<i64, AppError> {
        let row = self.fetch_optional(q).await?;
        Ok(row
            .and_then(|r| r.get("count").and_then(Value::as_i64))
            .unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.execute_raw("SELECT 1").await
    }
}
