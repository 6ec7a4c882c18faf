//! # Tables
//!
//! Locating the tables a workbook declares, parsing their ranges and reading
//! them into [`reader::TabularResult`] values with database-ready column names.
pub mod header;
pub mod locator;
pub mod range;
pub mod reader;
