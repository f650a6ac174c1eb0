//! Table models.
//!
//! Contains the schema description of a table, the raw snapshot returned by
//! a projected SELECT and the grid shape served to the form.

use std::fmt;

use serde::{Serialize, Serializer};
use utoipa::ToSchema;

/// One column as reported by `INFORMATION_SCHEMA.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Declared type (`DATA_TYPE`), e.g. `int` or `geometry`.
    pub declared_type: String,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// Owning schema and column list of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TableSchema {
    /// Owning schema (first match by table name, `dbo` when not found).
    pub schema: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnDescriptor>,
}

/// A single cell value.
///
/// Decimal, GUID, XML and temporal values are carried as text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Returns the text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    /// CSV rendering: null is empty, booleans are `True`/`False`, binary is
    /// `0x`-prefixed hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(x) => write!(f, "{x}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bytes(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Int(n) => serializer.serialize_i64(*n),
            CellValue::Float(x) => serializer.serialize_f64(*x),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Bytes(_) => serializer.collect_str(self),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// A row as handed back by the driver.
///
/// Drivers are not consistent about single-column results: some yield a
/// bare scalar instead of a one-element row.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverRow {
    Scalar(CellValue),
    Tuple(Vec<CellValue>),
}

impl DriverRow {
    /// First cell of the row, if any.
    pub fn first(&self) -> Option<&CellValue> {
        match self {
            DriverRow::Scalar(value) => Some(value),
            DriverRow::Tuple(values) => values.first(),
        }
    }

    /// Cell at `idx`; a scalar only has index 0.
    pub fn get(&self, idx: usize) -> Option<&CellValue> {
        match self {
            DriverRow::Scalar(value) if idx == 0 => Some(value),
            DriverRow::Scalar(_) => None,
            DriverRow::Tuple(values) => values.get(idx),
        }
    }
}

/// Result of a projected SELECT: result-set column names plus raw rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<DriverRow>,
}

/// Table content served to the grid; rows are reconciled to the column width.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TableContent {
    /// Database name.
    pub database: String,
    /// Table name.
    pub table: String,
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Row values, one array per row.
    #[schema(value_type = Vec<Vec<Object>>)]
    pub rows: Vec<Vec<CellValue>>,
    /// Number of rows.
    pub row_count: usize,
}

/// Acknowledgement of a dropped table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DroppedTable {
    /// Database name.
    pub database: String,
    /// Dropped table.
    pub table: String,
    /// Message shown to the operator.
    pub message: String,
}

impl DroppedTable {
    pub fn new(database: &str, table: &str) -> Self {
        Self {
            database: database.to_string(),
            table: table.to_string(),
            message: format!("Table '{table}' deleted successfully!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_for_csv() {
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Bool(true).to_string(), "True");
        assert_eq!(CellValue::Bool(false).to_string(), "False");
        assert_eq!(CellValue::Int(-7).to_string(), "-7");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bytes(vec![0x0a, 0xff]).to_string(), "0x0AFF");
    }

    #[test]
    fn test_serialize_as_plain_json() {
        let row = vec![
            CellValue::Null,
            CellValue::Int(1),
            CellValue::from("POINT (1 2)"),
            CellValue::Bytes(vec![1, 2]),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,1,"POINT (1 2)","0x0102"]"#);
    }

    #[test]
    fn test_scalar_row_only_has_index_zero() {
        let row = DriverRow::Scalar(CellValue::Int(3));
        assert_eq!(row.first(), Some(&CellValue::Int(3)));
        assert_eq!(row.get(1), None);
    }

    #[test]
    fn test_dropped_table_message() {
        let dropped = DroppedTable::new("Sales", "Orders");
        assert_eq!(dropped.message, "Table 'Orders' deleted successfully!");
    }
}
