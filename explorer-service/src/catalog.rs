//! 目录与表操作
//!
//! The database operations behind every explorer action: list databases,
//! list base tables, describe a table, fetch its projected rows and drop it.
//! Each operation opens its own session from the credentials it was built
//! with and closes it before returning.

use std::sync::Arc;

use tracing::{debug, info, warn};

use common::errors::{AppError, AppResult};
use common::models::{
    ColumnDescriptor, ConnectionConfig, ServerCredentials, TableSchema, TableSnapshot,
};

use crate::projection::{build_drop, build_select};
use crate::session::{SessionFactory, SqlSession};

pub const LIST_DATABASES_SQL: &str = "SELECT name FROM sys.databases";

pub const LIST_TABLES_SQL: &str =
    "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE'";

pub const TABLE_SCHEMA_SQL: &str =
    "SELECT TABLE_SCHEMA FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = @P1";

pub const TABLE_COLUMNS_SQL: &str = "SELECT COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE TABLE_NAME = @P1 AND TABLE_SCHEMA = @P2 ORDER BY ORDINAL_POSITION";

/// Schema assumed when the table name is not found in the catalog.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Database operations bound to one snapshot of the credential fields.
pub struct Catalog {
    sessions: Arc<dyn SessionFactory>,
    credentials: ServerCredentials,
    timeout_secs: u64,
}

impl Catalog {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        credentials: ServerCredentials,
        timeout_secs: u64,
    ) -> Self {
        Self {
            sessions,
            credentials,
            timeout_secs,
        }
    }

    fn descriptor(&self, database: &str) -> ConnectionConfig {
        ConnectionConfig::for_database(&self.credentials, database, self.timeout_secs)
    }

    async fn open(&self, config: ConnectionConfig) -> AppResult<Box<dyn SqlSession>> {
        debug!(connection = ?config, "opening session");
        self.sessions.open(&config).await
    }

    /// Names of all databases visible to the login, in server order.
    pub async fn list_databases(&self) -> AppResult<Vec<String>> {
        let config = ConnectionConfig::for_master(&self.credentials, self.timeout_secs);
        let mut session = self.open(config).await?;
        let outcome = session
            .query(LIST_DATABASES_SQL, &[])
            .await
            .map(|set| set.first_column_text());
        finish(session, outcome).await
    }

    /// Base tables of `database`; views are excluded.
    pub async fn list_tables(&self, database: &str) -> AppResult<Vec<String>> {
        let mut session = self.open(self.descriptor(database)).await?;
        let outcome = session
            .query(LIST_TABLES_SQL, &[])
            .await
            .map(|set| set.first_column_text());
        finish(session, outcome).await
    }

    /// Owning schema and columns of `table`.
    pub async fn describe_table(&self, database: &str, table: &str) -> AppResult<TableSchema> {
        let mut session = self.open(self.descriptor(database)).await?;
        let outcome = describe(session.as_mut(), table).await;
        finish(session, outcome).await
    }

    /// Rows of `table` through the text-converting projection.
    pub async fn fetch_rows(&self, database: &str, table: &str) -> AppResult<TableSnapshot> {
        let mut session = self.open(self.descriptor(database)).await?;
        let outcome = fetch(session.as_mut(), table).await;
        finish(session, outcome).await
    }

    /// Drops `table`. No confirmation, no dependency check.
    pub async fn drop_table(&self, database: &str, table: &str) -> AppResult<()> {
        let mut session = self.open(self.descriptor(database)).await?;
        let outcome = session.execute(&build_drop(table)).await.map(|_| ());
        if outcome.is_ok() {
            info!(database, table, "table dropped");
        }
        finish(session, outcome).await
    }
}

/// Closes the session and hands back the operation's own outcome. A failed
/// close after the work is done is only logged.
async fn finish<T>(session: Box<dyn SqlSession>, outcome: AppResult<T>) -> AppResult<T> {
    if let Err(e) = session.close().await {
        warn!(error = %e, "closing session failed");
    }
    outcome
}

async fn describe(session: &mut dyn SqlSession, table: &str) -> AppResult<TableSchema> {
    // First match wins when the name exists in several schemas.
    let schema = session
        .query(TABLE_SCHEMA_SQL, &[table])
        .await?
        .first_column_text()
        .into_iter()
        .next()
        .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());

    let set = session
        .query(TABLE_COLUMNS_SQL, &[table, schema.as_str()])
        .await?;
    let columns = set
        .rows
        .iter()
        .filter_map(|row| {
            let name = row.get(0)?.as_text()?;
            let declared_type = row.get(1)?.as_text()?;
            Some(ColumnDescriptor::new(name, declared_type))
        })
        .collect();

    Ok(TableSchema { schema, columns })
}

async fn fetch(session: &mut dyn SqlSession, table: &str) -> AppResult<TableSnapshot> {
    let TableSchema { schema, columns } = describe(session, table).await?;
    if columns.is_empty() {
        return Err(AppError::DatabaseQuery(format!(
            "no columns found for table '{table}' in schema '{schema}'"
        )));
    }

    let sql = build_select(&schema, table, &columns);
    let set = session.query(&sql, &[]).await?;
    Ok(TableSnapshot {
        columns: set.columns,
        rows: set.rows,
    })
}
