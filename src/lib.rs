//! # Rate Tables
//!
//! Locates the tables an Excel workbook declares, reads each one into typed
//! rows with database-ready column names, and loads them into DuckDB.
//!
//! ## Features
//!
//! - **Table discovery**: reads the workbook's table-definition parts for each
//!   table's name, sheet and range, with a configurable fallback table when
//!   the workbook declares none
//! - **Bounded reads**: streams only the cells inside a table's range from the
//!   `.xlsx` archive
//! - **Clean headers**: sanitized, lowercase, de-duplicated column names
//! - **Typed values**: booleans, numbers, text and date-formatted timestamps
//! - **Database loading**: inferred column types, confirmation before creating
//!   or replacing tables, batched inserts
//! - **Part inspection**: unpacks the structural XML parts of a workbook
//!
//! ## Example
//!
//! ```no_run
//! use rate_tables::{extract_table, locate_tables, Config};
//!
//! let config = Config::default();
//! for table in locate_tables("rates.xlsx", &config).descriptors() {
//!     let result = extract_table("rates.xlsx", &table);
//!     println!("{}: {} rows", table.name, result.row_count());
//! }
//! ```
pub mod config;
pub mod database;
pub mod error;
mod helpers;
pub mod inspect;
pub mod spreadsheet;
pub mod table;

#[cfg(test)]
mod fixtures;

pub use config::Config;
pub use database::loader::AssumeYes;
pub use database::loader::Confirm;
pub use database::loader::LoadOutcome;
pub use database::loader::Loader;
pub use error::RateTablesError;
pub use inspect::unpack_parts;
pub use spreadsheet::Value;
pub use table::locator::find_tables;
pub use table::locator::locate_tables;
pub use table::locator::Discovery;
pub use table::locator::TableDescriptor;
pub use table::range::CellRange;
pub use table::reader::extract_table;
pub use table::reader::read_table;
pub use table::reader::TabularResult;
