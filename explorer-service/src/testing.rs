//! In-memory SQL Server stand-in for tests.
//!
//! Understands exactly the statements the catalog issues: the database and
//! table listings, the schema and column lookups, the projected SELECT and
//! the unqualified DROP TABLE. Anything else is a syntax error.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use common::errors::{AppError, AppResult};
use common::models::connection::MASTER_DATABASE;
use common::models::{CellValue, ColumnDescriptor, ConnectionConfig, DriverRow};

use crate::catalog::{LIST_DATABASES_SQL, LIST_TABLES_SQL, TABLE_COLUMNS_SQL, TABLE_SCHEMA_SQL};
use crate::session::{ResultSet, SessionFactory, SqlSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableKind {
    Base,
    View,
}

/// A table or view of the fake server.
#[derive(Debug, Clone)]
pub struct FakeTable {
    schema: String,
    name: String,
    kind: TableKind,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<DriverRow>,
    raw_rows: bool,
    referenced: bool,
    unreadable: bool,
}

impl FakeTable {
    fn new(schema: &str, name: &str, kind: TableKind) -> Self {
        Self {
            schema: schema.to_string(),
            name: name.to_string(),
            kind,
            columns: Vec::new(),
            rows: Vec::new(),
            raw_rows: false,
            referenced: false,
            unreadable: false,
        }
    }

    pub fn base(schema: &str, name: &str) -> Self {
        Self::new(schema, name, TableKind::Base)
    }

    pub fn view(schema: &str, name: &str) -> Self {
        Self::new(schema, name, TableKind::View)
    }

    pub fn column(mut self, name: &str, declared_type: &str) -> Self {
        self.columns.push(ColumnDescriptor::new(name, declared_type));
        self
    }

    /// Stored row; cells of text-converted columns hold the native bytes.
    pub fn row(mut self, cells: Vec<CellValue>) -> Self {
        self.rows.push(DriverRow::Tuple(cells));
        self
    }

    /// Rows handed back verbatim by SELECT, whatever their shape.
    pub fn raw_rows(mut self, rows: Vec<DriverRow>) -> Self {
        self.rows = rows;
        self.raw_rows = true;
        self
    }

    /// Another table holds a foreign key to this one.
    pub fn referenced(mut self) -> Self {
        self.referenced = true;
        self
    }

    /// SELECT on this table is denied.
    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    databases: Vec<(String, Vec<FakeTable>)>,
    reject_logins: bool,
    opened: Vec<String>,
    closed: usize,
    executed: Vec<String>,
}

/// Cloneable handle to the shared fake state.
#[derive(Debug, Clone)]
pub struct FakeServer {
    state: Arc<Mutex<FakeState>>,
}

impl FakeServer {
    pub fn new() -> Self {
        let state = FakeState {
            databases: vec![(MASTER_DATABASE.to_string(), Vec::new())],
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_database(self, name: &str, tables: Vec<FakeTable>) -> Self {
        self.state
            .lock()
            .unwrap()
            .databases
            .push((name.to_string(), tables));
        self
    }

    pub fn rejecting_logins(self) -> Self {
        self.state.lock().unwrap().reject_logins = true;
        self
    }

    /// Databases sessions were opened against, in order.
    pub fn opened_databases(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    /// Sessions opened but not closed yet.
    pub fn open_sessions(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.opened.len() - state.closed
    }

    /// Every statement received, in order.
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    fn open_sync(&self, config: &ConnectionConfig) -> AppResult<FakeSession> {
        let mut state = self.state.lock().unwrap();
        if state.reject_logins {
            return Err(AppError::DatabaseConnection(format!(
                "Login failed for user '{}'.",
                config.username
            )));
        }
        if !state.databases.iter().any(|(name, _)| *name == config.database) {
            return Err(AppError::DatabaseConnection(format!(
                "Cannot open database \"{}\" requested by the login.",
                config.database
            )));
        }
        state.opened.push(config.database.clone());
        Ok(FakeSession {
            state: Arc::clone(&self.state),
            database: config.database.clone(),
        })
    }
}

#[async_trait]
impl SessionFactory for FakeServer {
    async fn open(&self, config: &ConnectionConfig) -> AppResult<Box<dyn SqlSession>> {
        let session = self.open_sync(config)?;
        Ok(Box::new(session))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    database: String,
}

impl FakeSession {
    fn query_sync(&self, sql: &str, params: &[&str]) -> AppResult<ResultSet> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(sql.to_string());
        let tables = tables_of(&state, &self.database);

        if sql == LIST_DATABASES_SQL {
            let rows = state
                .databases
                .iter()
                .map(|(name, _)| text_row(name))
                .collect();
            return Ok(result(&["name"], rows));
        }
        if sql == LIST_TABLES_SQL {
            let rows = tables
                .iter()
                .filter(|t| t.kind == TableKind::Base)
                .map(|t| text_row(&t.name))
                .collect();
            return Ok(result(&["TABLE_NAME"], rows));
        }
        if sql == TABLE_SCHEMA_SQL {
            let rows = tables
                .iter()
                .filter(|t| t.name == params[0])
                .map(|t| text_row(&t.schema))
                .collect();
            return Ok(result(&["TABLE_SCHEMA"], rows));
        }
        if sql == TABLE_COLUMNS_SQL {
            let rows = tables
                .iter()
                .filter(|t| t.name == params[0] && t.schema == params[1])
                .flat_map(|t| t.columns.iter())
                .map(|c| {
                    DriverRow::Tuple(vec![
                        CellValue::from(c.name.as_str()),
                        CellValue::from(c.declared_type.as_str()),
                    ])
                })
                .collect();
            return Ok(result(&["COLUMN_NAME", "DATA_TYPE"], rows));
        }
        if let Some(rest) = sql.strip_prefix("SELECT ") {
            return select(&tables, rest);
        }
        Err(syntax_error(sql))
    }

    fn execute_sync(&self, sql: &str) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(sql.to_string());

        let name = sql
            .strip_prefix("DROP TABLE ")
            .map(unquote)
            .ok_or_else(|| syntax_error(sql))?;
        let database = self.database.clone();
        let tables = state
            .databases
            .iter_mut()
            .find(|(db, _)| *db == database)
            .map(|(_, tables)| tables)
            .ok_or_else(|| AppError::Internal("session database vanished".into()))?;

        // Unqualified names resolve against the login's default schema.
        let idx = tables
            .iter()
            .position(|t| t.kind == TableKind::Base && t.schema == "dbo" && t.name == name)
            .ok_or_else(|| {
                AppError::DatabaseQuery(format!(
                    "Cannot drop the table '{name}', because it does not exist or you do not have permission."
                ))
            })?;
        if tables[idx].referenced {
            return Err(AppError::DatabaseQuery(format!(
                "Could not drop object '{name}' because it is referenced by a FOREIGN KEY constraint."
            )));
        }
        tables.remove(idx);
        Ok(0)
    }
}

#[async_trait]
impl SqlSession for FakeSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> AppResult<ResultSet> {
        self.query_sync(sql, params)
    }

    async fn execute(&mut self, sql: &str) -> AppResult<u64> {
        self.execute_sync(sql)
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        self.state.lock().unwrap().closed += 1;
        Ok(())
    }
}

fn tables_of(state: &FakeState, database: &str) -> Vec<FakeTable> {
    state
        .databases
        .iter()
        .find(|(name, _)| name == database)
        .map(|(_, tables)| tables.clone())
        .unwrap_or_default()
}

fn select(tables: &[FakeTable], rest: &str) -> AppResult<ResultSet> {
    let (projection, from) = rest
        .split_once(" FROM ")
        .ok_or_else(|| syntax_error(rest))?;
    let (schema, name) = from
        .split_once("].[")
        .map(|(s, n)| (unquote(&format!("{s}]")), unquote(&format!("[{n}"))))
        .ok_or_else(|| syntax_error(from))?;

    let table = tables
        .iter()
        .find(|t| t.schema == schema && t.name == name)
        .ok_or_else(|| AppError::DatabaseQuery(format!("Invalid object name '{schema}.{name}'.")))?;
    if table.unreadable {
        return Err(AppError::DatabaseQuery(format!(
            "The SELECT permission was denied on the object '{name}'."
        )));
    }

    // (alias, index into the table's columns, converted to text)
    let mut items = Vec::new();
    for item in split_projection(projection) {
        let (column, converted) = match item.strip_prefix("CONVERT(NVARCHAR(MAX), ") {
            Some(converted) => {
                let (_, alias) = converted.split_once(") AS ").ok_or_else(|| syntax_error(item))?;
                (unquote(alias), true)
            }
            None => (unquote(item), false),
        };
        let idx = table
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| AppError::DatabaseQuery(format!("Invalid column name '{column}'.")))?;
        items.push((column, idx, converted));
    }

    let columns = items.iter().map(|(alias, _, _)| alias.clone()).collect();
    let rows = if table.raw_rows {
        table.rows.clone()
    } else {
        table
            .rows
            .iter()
            .map(|row| {
                let cells = items
                    .iter()
                    .map(|(_, idx, converted)| {
                        let cell = row.get(*idx).cloned().unwrap_or(CellValue::Null);
                        if *converted {
                            to_text(cell)
                        } else {
                            cell
                        }
                    })
                    .collect();
                DriverRow::Tuple(cells)
            })
            .collect()
    };

    Ok(ResultSet { columns, rows })
}

/// Splits a select list on top-level commas.
fn split_projection(projection: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let (mut depth, mut in_ident, mut start) = (0usize, false, 0usize);
    for (i, ch) in projection.char_indices() {
        match ch {
            '[' if !in_ident => in_ident = true,
            ']' if in_ident => in_ident = false,
            '(' if !in_ident => depth += 1,
            ')' if !in_ident => depth = depth.saturating_sub(1),
            ',' if !in_ident && depth == 0 => {
                items.push(projection[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(projection[start..].trim());
    items
}

fn to_text(cell: CellValue) -> CellValue {
    match cell {
        CellValue::Null => CellValue::Null,
        CellValue::Bytes(bytes) => CellValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        other => CellValue::Text(other.to_string()),
    }
}

fn unquote(ident: &str) -> String {
    ident
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .replace("]]", "]")
}

fn text_row(value: &str) -> DriverRow {
    DriverRow::Tuple(vec![CellValue::from(value)])
}

fn result(columns: &[&str], rows: Vec<DriverRow>) -> ResultSet {
    ResultSet {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

fn syntax_error(sql: &str) -> AppError {
    AppError::DatabaseQuery(format!("Incorrect syntax near '{sql}'."))
}
