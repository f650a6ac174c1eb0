//! 列投影
//!
//! Some native column types cannot be read by the client or rendered in a
//! grid. Those columns are selected through a string conversion and aliased
//! back to their own name; every other column is selected unchanged. The
//! list is a fixed table: a type the client cannot decode has to be added
//! here by hand.

use common::models::ColumnDescriptor;
use common::utils::{quote_ident, quote_qualified};

/// Declared types selected through a string conversion.
pub const TEXT_CONVERTED_TYPES: [&str; 5] = [
    "datetimeoffset",
    "sql_variant",
    "geometry",
    "geography",
    "hierarchyid",
];

/// Target type of the string conversion.
const TEXT_TARGET: &str = "NVARCHAR(MAX)";

/// Whether a declared type (any case) needs the string conversion.
pub fn needs_text_conversion(declared_type: &str) -> bool {
    TEXT_CONVERTED_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(declared_type.trim()))
}

/// Select-list expression for one column.
pub fn select_expression(column: &ColumnDescriptor) -> String {
    let name = quote_ident(&column.name);
    if needs_text_conversion(&column.declared_type) {
        format!("CONVERT({TEXT_TARGET}, {name}) AS {name}")
    } else {
        name
    }
}

/// `SELECT <projection> FROM [schema].[table]`.
pub fn build_select(schema: &str, table: &str, columns: &[ColumnDescriptor]) -> String {
    let projection = columns
        .iter()
        .map(select_expression)
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {}", projection, quote_qualified(schema, table))
}

/// `DROP TABLE [table]`, deliberately not schema-qualified.
pub fn build_drop(table: &str) -> String {
    format!("DROP TABLE {}", quote_ident(table))
}
