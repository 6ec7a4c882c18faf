use crate::spreadsheet::cell::Cell;
use std::collections::BTreeMap;

/// A bounded rectangular region of one worksheet.
///
/// Cells outside the bounds are never stored. Rows are kept sparsely so a
/// wide declared range over a short sheet costs only the rows that exist.
#[derive(Debug)]
pub(crate) struct Region {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// First row (0-based, inclusive)
    pub(crate) row_lower_bound: usize,
    /// Last row (0-based, inclusive)
    pub(crate) row_upper_bound: usize,
    /// First column (0-based, inclusive)
    pub(crate) col_lower_bound: usize,
    /// Last column (0-based, inclusive)
    pub(crate) col_upper_bound: usize,
    /// Populated rows keyed by row index, each `width()` cells wide
    rows: BTreeMap<usize, Vec<Option<Cell>>>,
}

impl Region {
    pub(crate) fn new(
        file_name: &str,
        name: &str,
        (row_lower_bound, col_lower_bound): (usize, usize),
        (row_upper_bound, col_upper_bound): (usize, usize),
    ) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            row_lower_bound,
            row_upper_bound,
            col_lower_bound,
            col_upper_bound,
            rows: BTreeMap::new(),
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.col_upper_bound - self.col_lower_bound + 1
    }

    /// Checks if a row is after the upper bound; rows arrive in order so reading can stop.
    pub(crate) fn after_row_upper_bound(&self, row: usize) -> bool {
        self.row_upper_bound < row
    }

    /// Checks if a cell at (row, col) is within the region.
    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        self.row_lower_bound <= row
            && row <= self.row_upper_bound
            && self.col_lower_bound <= col
            && col <= self.col_upper_bound
    }

    /// Adds a cell; cells outside the region are ignored.
    pub(crate) fn push(&mut self, cell: Cell) {
        if !self.contains(cell.row, cell.col) {
            return;
        }
        let width = self.width();
        let offset = cell.col - self.col_lower_bound;
        let record = self.rows.entry(cell.row).or_insert_with(|| vec![None; width]);
        record[offset] = Some(cell);
    }

    /// Mutable access to every stored cell, used to resolve shared strings.
    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows.values_mut().flatten().flatten()
    }

    /// The first row of the region, all `None` when the sheet has nothing there.
    pub(crate) fn header(&self) -> Vec<Option<&Cell>> {
        self.row(self.row_lower_bound)
    }

    /// The populated rows after the first one, in row order.
    pub(crate) fn data_rows(&self) -> impl Iterator<Item = Vec<Option<&Cell>>> + '_ {
        self.rows
            .range((self.row_lower_bound + 1)..)
            .map(|(_, record)| record.iter().map(Option::as_ref).collect())
    }

    fn row(&self, row: usize) -> Vec<Option<&Cell>> {
        match self.rows.get(&row) {
            Some(record) => record.iter().map(Option::as_ref).collect(),
            None => vec![None; self.width()],
        }
    }
}
