use crate::database::column::Column;
use crate::table::reader::TabularResult;

/// Quotes an identifier for DuckDB, doubling embedded quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A database table about to be created from extracted rows.
#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema {
    /// Target table name, prefix included
    pub name: String,
    /// Column definitions in result order
    pub columns: Vec<Column>,
}

impl TableSchema {
    /// Infers the schema of `result` stored under `name`.
    pub fn infer(name: &str, result: &TabularResult) -> Self {
        TableSchema {
            name: name.to_owned(),
            columns: Column::infer_all(result),
        }
    }

    pub(crate) fn create_sql(&self) -> String {
        let columns = self.columns
            .iter()
            .map(|column| format!("{} {}", quote_identifier(&column.name), column.kind.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", quote_identifier(&self.name), columns)
    }

    pub(crate) fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.name))
    }

    /// Parameterized single-row insert over every column.
    pub(crate) fn insert_sql(&self) -> String {
        let names = self.columns
            .iter()
            .map(|column| quote_identifier(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!("INSERT INTO {} ({}) VALUES ({})", quote_identifier(&self.name), names, placeholders)
    }
}
