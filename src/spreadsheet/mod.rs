//! # Workbook Access
//!
//! Streaming access to xlsx workbooks: the workbook and relationship parts,
//! shared strings, number formats, worksheet cells inside a bounded region,
//! and the table-definition parts the table locator is built on.
use thiserror::Error;

pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

pub use cell::Value;

/// Errors raised while reading a workbook's structure or cells.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in workbook")]
    FileError(String),

    #[error("Workbook '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Sheet '{1}' not found in '{0}'")]
    SheetNotFoundError(String, String),

    #[error("Table definition '{0}' has no <table> element")]
    TableDefinitionError(String),

    #[error("Cell {0} references missing shared string {1}")]
    SharedStringError(String, usize),
}
