//! 数据库会话抽象
//!
//! Every explorer action opens exactly one session per step, runs its
//! statements sequentially and closes it again. Nothing is pooled.

use async_trait::async_trait;

use common::errors::AppResult;
use common::models::{ConnectionConfig, DriverRow};

/// Column names and rows of the first result set of a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<DriverRow>,
}

impl ResultSet {
    /// Text values of the first column, skipping nulls and non-text cells.
    pub fn first_column_text(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first().and_then(|v| v.as_text()).map(str::to_string))
            .collect()
    }
}

/// An open session against one database.
#[async_trait]
pub trait SqlSession: Send {
    /// Runs a query; `params` bind to `@P1`, `@P2`, ... in order.
    async fn query(&mut self, sql: &str, params: &[&str]) -> AppResult<ResultSet>;

    /// Runs a statement in autocommit mode and returns the affected row count.
    async fn execute(&mut self, sql: &str) -> AppResult<u64>;

    /// Closes the session.
    async fn close(self: Box<Self>) -> AppResult<()>;
}

/// Opens sessions from a connection descriptor.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, config: &ConnectionConfig) -> AppResult<Box<dyn SqlSession>>;
}
