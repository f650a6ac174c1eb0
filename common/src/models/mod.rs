//! Shared data models.

pub mod connection;
pub mod table;

// Re-export commonly used types
pub use connection::{
    ConnectionConfig, CredentialsItem, ServerCredentials, UpdateCredentialsRequest,
};
pub use table::{
    CellValue, ColumnDescriptor, DriverRow, DroppedTable, TableContent, TableSchema,
    TableSnapshot,
};
