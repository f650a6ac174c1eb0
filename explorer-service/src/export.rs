//! 数据库导出
//!
//! Packs every base table of a database into one in-memory zip archive,
//! one `<table>.csv` entry per table. The export is all-or-nothing: the
//! first table that fails aborts it and no archive is produced.

use std::io::{Cursor, Write};

use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use common::errors::{AppError, AppResult};
use common::models::TableSnapshot;

use crate::catalog::Catalog;
use crate::shape::normalize_rows;

/// MIME type of the download.
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportArchive {
    database: String,
    tables: usize,
    bytes: Vec<u8>,
}

impl ExportArchive {
    /// Download name: `<database>.zip`.
    pub fn file_name(&self) -> String {
        format!("{}.zip", self.database)
    }

    /// `Content-Disposition` value for the download. The plain `filename`
    /// is an ASCII fallback with `"` and `\` escaped; `filename*` carries the
    /// exact name percent-encoded as UTF-8.
    pub fn content_disposition(&self) -> String {
        let name = self.file_name();
        let mut fallback = String::with_capacity(name.len());
        for ch in name.chars() {
            match ch {
                '"' | '\\' => {
                    fallback.push('\\');
                    fallback.push(ch);
                }
                c if c.is_ascii() && !c.is_ascii_control() => fallback.push(c),
                _ => fallback.push('_'),
            }
        }
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            urlencoding::encode(&name)
        )
    }

    /// Number of CSV entries.
    pub fn table_count(&self) -> usize {
        self.tables
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Serializes one table: header row of column names, then one line per
/// row reconciled to the column count. No index column.
pub fn table_csv(snapshot: TableSnapshot) -> AppResult<Vec<u8>> {
    let width = snapshot.columns.len();
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&snapshot.columns).map_err(csv_error)?;
    for row in normalize_rows(snapshot.rows, width) {
        writer
            .write_record(row.iter().map(|cell| cell.to_string()))
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Export(e.to_string()))
}

/// Exports every base table of `database` as a deflate-compressed zip.
pub async fn export_database(catalog: &Catalog, database: &str) -> AppResult<ExportArchive> {
    let tables = catalog.list_tables(database).await?;
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for table in &tables {
        let snapshot = catalog.fetch_rows(database, table).await?;
        let rows = snapshot.rows.len();
        let csv = table_csv(snapshot)?;

        zip.start_file(format!("{table}.csv"), options)
            .map_err(zip_error)?;
        zip.write_all(&csv)
            .map_err(|e| AppError::Export(e.to_string()))?;
        debug!(database, table = %table, rows, "table written to archive");
    }

    let bytes = zip.finish().map_err(zip_error)?.into_inner();
    info!(database, tables = tables.len(), bytes = bytes.len(), "export packaged");

    Ok(ExportArchive {
        database: database.to_string(),
        tables: tables.len(),
        bytes,
    })
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Export(format!("csv: {e}"))
}

fn zip_error(e: zip::result::ZipError) -> AppError {
    AppError::Export(format!("zip: {e}"))
}
