use crate::error::RateTablesError;
use crate::error::ResultMessage;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use crate::spreadsheet::Value;
use crate::table::header::dedupe_column_names;
use crate::table::header::sanitize_column_name;
use crate::table::locator::TableDescriptor;
use crate::table::range::CellRange;
use std::path::Path;
use tracing::debug;
use tracing::error;
use tracing::info;

/// Rows extracted from one table.
///
/// Every row holds one value per column, in column order. Column names are
/// unique and no row is entirely null. The default value (no columns, no
/// rows) signals a failed extraction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    /// True when there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Value of the named column in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    /// Rows as (column name, value) pairs, in column order.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> + '_ {
        self.rows.iter().map(|row| {
            self.columns.iter().map(String::as_str).zip(row.iter()).collect()
        })
    }

    /// Renders the first `limit` rows as a bordered text grid.
    pub fn preview(&self, limit: usize) -> String {
        let rows: Vec<Vec<String>> = self.rows.iter()
            .take(limit)
            .map(|row| row.iter().map(Value::to_string).collect())
            .collect();
        let widths: Vec<usize> = self.columns.iter()
            .enumerate()
            .map(|(index, column)| {
                rows.iter()
                    .filter_map(|row| row.get(index))
                    .map(|value| value.chars().count())
                    .fold(column.chars().count(), usize::max)
            })
            .collect();

        let border: String = widths.iter()
            .map(|width| format!("+{}", "-".repeat(width + 2)))
            .collect::<String>() + "+\n";
        let line = |values: &[String]| -> String {
            values.iter()
                .zip(&widths)
                .map(|(value, width)| format!("| {:<width$} ", value, width = width))
                .collect::<String>() + "|\n"
        };

        let mut grid = border.to_owned();
        grid.push_str(&line(&self.columns));
        grid.push_str(&border.replace('-', "="));
        for row in &rows {
            grid.push_str(&line(row));
            grid.push_str(&border);
        }
        grid
    }
}

/// Reads the table inside `range` on `sheet`.
///
/// The first row of the range is the header row; its values are sanitized
/// and made unique. Every later row inside the range is data, and rows whose
/// cells are all empty are dropped. A range running past the sheet's last
/// row simply yields fewer rows.
pub fn read_table(path: impl AsRef<Path>, sheet: &str, range: &CellRange) -> Result<TabularResult, RateTablesError> {
    let path = path.as_ref();
    let mut workbook = XlsxWorkbook::open(path)
        .with_prefix(&format!("Open workbook '{}'", path.display()))?;
    let region = workbook.read_region(sheet, range)
        .with_prefix(&format!("Read {} on '{}'", range, sheet))?;

    let headers = region.header()
        .into_iter()
        .map(|cell| sanitize_column_name(cell.map(Cell::to_value).and_then(|value| value.to_header_text()).as_deref()))
        .collect();
    let columns = dedupe_column_names(headers);

    let rows: Vec<Vec<Value>> = region.data_rows()
        .map(|record| record.into_iter().map(|cell| cell.map(Cell::to_value).unwrap_or_default()).collect::<Vec<Value>>())
        .filter(|row| !row.iter().all(Value::is_null))
        .collect();
    debug!("Read {} data rows from '{}' in '{}'", rows.len(), region.name, region.file_name);

    Ok(TabularResult { columns, rows })
}

/// Extracts one located table, logging what happened.
///
/// An unparsable range, an unreadable workbook or a missing sheet yields an
/// empty [`TabularResult`]; callers skip such tables.
pub fn extract_table(path: impl AsRef<Path>, table: &TableDescriptor) -> TabularResult {
    info!("Extracting data from '{}', range {}", table.sheet, table.range);
    let range = match CellRange::parse(&table.range) {
        Ok(range) => range,
        Err(failure) => {
            error!("Could not parse range of table '{}': {}", table.name, failure);
            return TabularResult::default();
        }
    };
    match read_table(path, &table.sheet, &range) {
        Ok(result) => {
            info!("Extracted {} rows and {} columns from '{}'", result.row_count(), result.column_count(), table.name);
            result
        }
        Err(failure) => {
            error!("Error extracting table '{}': {}", table.name, failure);
            TabularResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureCell::*;
    use crate::fixtures::WorkbookBuilder;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn us_address() -> (tempfile::TempDir, std::path::PathBuf) {
        WorkbookBuilder::new()
            .sheet("Rates", vec![
                vec![Text("Street"), Text("City"), Text("State"), Text("Zip"), Text("Territory"), Text("Base Rate"), Text("Effective")],
                vec![Text("1 Main St"), Text("Miami"), Text("FL"), Inline("33101"), Number(1.0), Number(412.5), Date(45292.0)],
                vec![Text("2 Oak Ave"), Text("Tampa"), Text("FL"), Inline("33602"), Number(2.0), Number(388.0), Date(45293.0)],
                vec![Text("3 Elm Rd"), Text("Orlando"), Text("FL"), Inline("32801"), Number(3.0), Number(401.25), Date(45294.0)],
                vec![Text("4 Bay Dr"), Text("Naples"), Text("FL"), Inline("34102"), Number(2.0), Formula("F3*1.1", 426.8), Date(45295.0)],
                vec![Empty, Empty, Empty, Empty, Empty, Empty, Empty],
            ])
            .table(0, "USAddress", "A1:G6")
            .write()
    }

    #[test]
    fn reads_table_with_headers_and_drops_blank_rows() {
        let (_directory, path) = us_address();
        let range = CellRange::parse("A1:G6").unwrap();
        let result = read_table(&path, "Rates", &range).unwrap();

        assert_eq!(result.columns, vec!["street", "city", "state", "zip", "territory", "base_rate", "effective"]);
        assert_eq!(result.row_count(), 4);
        assert_eq!(result.get(0, "zip"), Some(&Value::Text("33101".to_owned())));
        assert_eq!(result.get(3, "base_rate"), Some(&Value::Number(426.8)));
        assert_eq!(
            result.get(1, "effective"),
            Some(&Value::DateTime(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap())),
        );
    }

    #[test]
    fn extracts_located_table_end_to_end() {
        let (_directory, path) = us_address();
        let table = TableDescriptor {
            name: "USAddress".to_owned(),
            sheet: "Rates".to_owned(),
            range: "$A$1:$G$5".to_owned(),
        };
        let result = extract_table(&path, &table);

        assert_eq!(result.row_count(), 4);
        assert_eq!(result.column_count(), 7);
        let records: Vec<_> = result.records().collect();
        assert_eq!(records[2][1], ("city", &Value::Text("Orlando".to_owned())));
    }

    #[test]
    fn single_cell_range_is_header_only() {
        let (_directory, path) = us_address();
        let range = CellRange::parse("A1:A1").unwrap();
        let result = read_table(&path, "Rates", &range).unwrap();

        assert_eq!(result.columns, vec!["street"]);
        assert_eq!(result.row_count(), 0);
    }

    #[test]
    fn duplicate_and_missing_headers_are_made_unique() {
        let (_directory, path) = WorkbookBuilder::new()
            .sheet("Rates", vec![
                vec![Text("Rate"), Text("rate"), Empty, Number(2024.0), Text("Rate!")],
                vec![Number(1.0), Number(2.0), Number(3.0), Number(4.0), Number(5.0)],
            ])
            .write();
        let range = CellRange::parse("A1:E2").unwrap();
        let result = read_table(&path, "Rates", &range).unwrap();

        assert_eq!(result.columns, vec!["rate", "rate_2", "unnamed_column", "col_2024", "rate_3"]);
        assert_eq!(result.rows, vec![vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0),
            Value::Number(4.0),
            Value::Number(5.0),
        ]]);
    }

    #[test]
    fn partially_empty_rows_are_kept() {
        let (_directory, path) = WorkbookBuilder::new()
            .sheet("Rates", vec![
                vec![Text("A"), Text("B")],
                vec![Empty, Text("only b")],
                vec![Error("#N/A"), Empty],
                vec![Bool(false), Empty],
            ])
            .write();
        let range = CellRange::parse("A1:B40").unwrap();
        let result = read_table(&path, "Rates", &range).unwrap();

        assert_eq!(result.rows, vec![
            vec![Value::Null, Value::Text("only b".to_owned())],
            vec![Value::Boolean(false), Value::Null],
        ]);
    }

    #[test]
    fn out_of_range_dates_stay_numbers() {
        let (_directory, path) = WorkbookBuilder::new()
            .sheet("Rates", vec![
                vec![Text("Effective")],
                vec![Date(1e15)],
                vec![Date(45292.0)],
            ])
            .write();
        let range = CellRange::parse("A1:A3").unwrap();
        let result = read_table(&path, "Rates", &range).unwrap();

        assert_eq!(result.rows, vec![
            vec![Value::Number(1e15)],
            vec![Value::DateTime(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())],
        ]);
    }

    #[test]
    fn failures_yield_an_empty_result() {
        let (_directory, path) = us_address();
        let table = |sheet: &str, range: &str| TableDescriptor {
            name: "USAddress".to_owned(),
            sheet: sheet.to_owned(),
            range: range.to_owned(),
        };

        assert_eq!(extract_table(&path, &table("Rates", "A1-G5")), TabularResult::default());
        assert_eq!(extract_table(&path, &table("Missing", "A1:G5")), TabularResult::default());
        assert_eq!(extract_table(path.with_extension("nope"), &table("Rates", "A1:G5")), TabularResult::default());
        assert!(read_table(&path, "Missing", &CellRange::parse("A1:B2").unwrap()).is_err());
    }

    #[test]
    fn preview_renders_a_grid() {
        let result = TabularResult {
            columns: vec!["zip".to_owned(), "rate".to_owned()],
            rows: vec![
                vec![Value::Text("33101".to_owned()), Value::Number(412.5)],
                vec![Value::Text("33602".to_owned()), Value::Null],
            ],
        };

        assert_eq!(result.preview(1), concat!(
            "+-------+-------+\n",
            "| zip   | rate  |\n",
            "+=======+=======+\n",
            "| 33101 | 412.5 |\n",
            "+-------+-------+\n",
        ));
    }
}
