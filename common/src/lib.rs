//! Shared building blocks for the SQL Server explorer.
//!
//! Holds configuration loading, the error type, the API response envelope,
//! the data models exchanged between the core and the HTTP boundary, and
//! identifier quoting helpers.

pub mod config;
pub mod errors;
pub mod models;
pub mod response;
pub mod utils;
