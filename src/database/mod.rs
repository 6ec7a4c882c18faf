//! # Database Loading
//!
//! Turns extracted tables into DuckDB tables: column type inference, schema
//! statements, and a loader that creates tables and inserts rows in batches.
use crate::table::header::sanitize_table_name;

pub mod column;
pub mod loader;
pub mod table;

/// Database table name for an Excel table: `prefix` followed by the sanitized name.
pub fn table_name(prefix: &str, raw: &str) -> String {
    format!("{}{}", prefix, sanitize_table_name(raw))
}
