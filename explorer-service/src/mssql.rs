//! SQL Server 会话实现（tiberius / TDS）
//!
//! Turns a [`ConnectionConfig`] into a tiberius client and maps TDS column
//! data onto [`CellValue`]s.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use common::errors::{AppError, AppResult};
use common::models::{CellValue, ConnectionConfig, DriverRow};

use crate::session::{ResultSet, SessionFactory, SqlSession};

/// Port used when the server address does not name one.
pub const DEFAULT_SQL_PORT: u16 = 1433;

const APPLICATION_NAME: &str = "explorer-service";

/// Opens real TDS sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct TdsSessionFactory;

/// A live TDS session.
pub struct TdsSession {
    client: Client<Compat<TcpStream>>,
}

/// Splits `host`, `host,port` or `tcp:host,port` into host and port.
pub fn parse_server(server: &str) -> AppResult<(String, u16)> {
    let trimmed = server.trim();
    let addr = trimmed.strip_prefix("tcp:").unwrap_or(trimmed);

    match addr.split_once(',') {
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|_| {
                AppError::DatabaseConnection(format!("invalid port in server address '{server}'"))
            })?;
            Ok((host.trim().to_string(), port))
        }
        None => Ok((addr.to_string(), DEFAULT_SQL_PORT)),
    }
}

/// Builds the tiberius configuration for one session.
pub fn build_config(config: &ConnectionConfig) -> AppResult<Config> {
    let (host, port) = parse_server(&config.server)?;

    let mut tds = Config::new();
    tds.host(host);
    tds.port(port);
    tds.database(&config.database);
    tds.application_name(APPLICATION_NAME);
    tds.authentication(AuthMethod::sql_server(&config.username, &config.password));

    if config.encrypt {
        tds.encryption(EncryptionLevel::Required);
    } else {
        tds.encryption(EncryptionLevel::Off);
    }
    if config.trust_server_certificate {
        tds.trust_cert();
    }

    Ok(tds)
}

async fn connect(mut tds: Config) -> AppResult<Client<Compat<TcpStream>>> {
    let tcp = open_tcp(&tds).await?;

    match Client::connect(tds.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        // Azure SQL may redirect the login to another node.
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!(host = %host, port, "following server redirect");
            tds.host(&host);
            tds.port(port);
            let tcp = open_tcp(&tds).await?;
            Client::connect(tds, tcp.compat_write())
                .await
                .map_err(|e| AppError::DatabaseConnection(e.to_string()))
        }
        Err(e) => Err(AppError::DatabaseConnection(e.to_string())),
    }
}

async fn open_tcp(tds: &Config) -> AppResult<TcpStream> {
    let tcp = TcpStream::connect(tds.get_addr())
        .await
        .map_err(|e| AppError::DatabaseConnection(format!("{}: {}", tds.get_addr(), e)))?;
    tcp.set_nodelay(true)
        .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
    Ok(tcp)
}

#[async_trait]
impl SessionFactory for TdsSessionFactory {
    async fn open(&self, config: &ConnectionConfig) -> AppResult<Box<dyn SqlSession>> {
        let tds = build_config(config)?;
        let start = Instant::now();

        let client = tokio::time::timeout(Duration::from_secs(config.timeout_secs), connect(tds))
            .await
            .map_err(|_| {
                AppError::DatabaseConnection(format!(
                    "timed out after {}s connecting to '{}'",
                    config.timeout_secs, config.server
                ))
            })??;

        info!(
            database = %config.database,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "session opened"
        );
        debug!(connection = %config.redacted_connection_string());
        Ok(Box::new(TdsSession { client }))
    }
}

#[async_trait]
impl SqlSession for TdsSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> AppResult<ResultSet> {
        debug!(sql, params = params.len(), "query");
        let bound: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        let mut stream = self.client.query(sql, &bound).await.map_err(statement_error)?;
        let columns = stream
            .columns()
            .await
            .map_err(statement_error)?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = stream.into_first_result().await.map_err(statement_error)?;

        Ok(ResultSet {
            columns,
            rows: rows.into_iter().map(driver_row).collect(),
        })
    }

    async fn execute(&mut self, sql: &str) -> AppResult<u64> {
        debug!(sql, "execute");
        let result = self.client.execute(sql, &[]).await.map_err(statement_error)?;
        Ok(result.total())
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        let TdsSession { client } = *self;
        client
            .close()
            .await
            .map_err(|e| AppError::DatabaseConnection(e.to_string()))
    }
}

/// I/O failures mid-session are connection errors; everything else the
/// server reports against a statement is a query error.
fn statement_error(e: tiberius::error::Error) -> AppError {
    match e {
        tiberius::error::Error::Io { .. } => AppError::DatabaseConnection(e.to_string()),
        _ => AppError::DatabaseQuery(e.to_string()),
    }
}

fn driver_row(row: tiberius::Row) -> DriverRow {
    DriverRow::Tuple(row.into_iter().map(cell_value).collect())
}

fn cell_value(data: ColumnData<'static>) -> CellValue {
    match data {
        ColumnData::U8(v) => v.map_or(CellValue::Null, |n| CellValue::Int(n.into())),
        ColumnData::I16(v) => v.map_or(CellValue::Null, |n| CellValue::Int(n.into())),
        ColumnData::I32(v) => v.map_or(CellValue::Null, |n| CellValue::Int(n.into())),
        ColumnData::I64(v) => v.map_or(CellValue::Null, CellValue::Int),
        ColumnData::F32(v) => v.map_or(CellValue::Null, |x| CellValue::Float(x.into())),
        ColumnData::F64(v) => v.map_or(CellValue::Null, CellValue::Float),
        ColumnData::Bit(v) => v.map_or(CellValue::Null, CellValue::Bool),
        ColumnData::String(v) => v.map_or(CellValue::Null, |s| CellValue::Text(s.into_owned())),
        ColumnData::Guid(v) => v.map_or(CellValue::Null, |g| CellValue::Text(g.to_string())),
        ColumnData::Binary(v) => v.map_or(CellValue::Null, |b| CellValue::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.map_or(CellValue::Null, |n| CellValue::Text(n.to_string())),
        ColumnData::Xml(v) => {
            v.map_or(CellValue::Null, |x| CellValue::Text(x.into_owned().into_string()))
        }
        other => temporal_value(&other),
    }
}

fn temporal_value(data: &ColumnData<'static>) -> CellValue {
    if let Ok(Some(dt)) = NaiveDateTime::from_sql(data) {
        return CellValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string());
    }
    if let Ok(Some(date)) = NaiveDate::from_sql(data) {
        return CellValue::Text(date.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(time)) = NaiveTime::from_sql(data) {
        return CellValue::Text(time.format("%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(dt)) = DateTime::<FixedOffset>::from_sql(data) {
        return CellValue::Text(dt.to_rfc3339());
    }
    CellValue::Null
}
