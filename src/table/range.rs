use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::index_to_col;
use regex::Regex;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Leading column letters of an endpoint, optionally `$`-anchored.
static COLUMN_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$?([A-Z]+)").expect("Hardcode regex pattern"));

/// Trailing row digits of an endpoint, optionally `$`-anchored.
static ROW_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$?([0-9]+)$").expect("Hardcode regex pattern"));

/// Errors related to Excel-style range parsing.
#[derive(Error, Debug, PartialEq)]
pub enum RangeError {
    #[error("Invalid range format '{0}', expected START:END")]
    FormatError(String),

    #[error("Invalid endpoint '{1}' in range '{0}'")]
    EndpointError(String, String),

    #[error("Range '{0}' ends before it starts")]
    ReversedError(String),
}

/// A rectangular, inclusive worksheet region.
///
/// Columns are zero-based indexes; rows keep spreadsheet numbering and are
/// one-based. A `CellRange` is only ever built with `start <= end` on both axes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub start_column: usize,
    pub start_row: usize,
    pub end_column: usize,
    pub end_row: usize,
}

impl CellRange {
    /// Parses an Excel-style range string such as `A1:G100` or `$B$2:$D$50`.
    ///
    /// Column letters and row digits are matched separately against each
    /// endpoint and must together cover it, so `A1B2:C3` is rejected rather
    /// than guessed at.
    pub fn parse(value: &str) -> Result<CellRange, RangeError> {
        let value = value.trim();
        let (start, end) = value
            .split_once(':')
            .filter(|(_, end)| !end.contains(':'))
            .ok_or_else(|| RangeError::FormatError(value.to_owned()))?;
        let (start_column, start_row) = parse_endpoint(start)
            .ok_or_else(|| RangeError::EndpointError(value.to_owned(), start.to_owned()))?;
        let (end_column, end_row) = parse_endpoint(end)
            .ok_or_else(|| RangeError::EndpointError(value.to_owned(), end.to_owned()))?;
        if start_column > end_column || start_row > end_row {
            Err(RangeError::ReversedError(value.to_owned()))?
        }
        Ok(CellRange {
            start_column,
            start_row,
            end_column,
            end_row,
        })
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.end_column - self.start_column + 1
    }

    /// Number of rows covered, header row included.
    pub fn height(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    /// Renders the absolute form, e.g. `$A$1:$G$33`.
    pub fn to_absolute(&self) -> String {
        format!(
            "${}${}:${}${}",
            index_to_col(self.start_column),
            self.start_row,
            index_to_col(self.end_column),
            self.end_row,
        )
    }
}

/// Splits one endpoint into (zero-based column, one-based row).
fn parse_endpoint(endpoint: &str) -> Option<(usize, usize)> {
    let endpoint = endpoint.to_ascii_uppercase();
    let column = COLUMN_PATTERN.captures(&endpoint)?;
    let row = ROW_PATTERN.captures(&endpoint)?;
    let (column_match, row_match) = (column.get(0)?, row.get(0)?);
    if column_match.end() != row_match.start() {
        return None;
    }
    let column = col_to_index(column.get(1)?.as_str())?;
    let row = row.get(1)?.as_str().parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((column, row))
}

impl FromStr for CellRange {
    type Err = RangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        CellRange::parse(value)
    }
}

impl TryFrom<&str> for CellRange {
    type Error = RangeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        CellRange::parse(value)
    }
}

impl Display for CellRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_absolute())
    }
}
