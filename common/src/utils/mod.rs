//! Utility functions and helpers.

pub mod sql_ident;

// Re-export commonly used helpers
pub use sql_ident::{quote_ident, quote_qualified};
