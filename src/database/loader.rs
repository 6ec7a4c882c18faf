use crate::database::column::ColumnType;
use crate::database::table::quote_identifier;
use crate::database::table::TableSchema;
use crate::error::RateTablesError;
use crate::error::ResultMessage;
use crate::spreadsheet::Value;
use crate::table::reader::TabularResult;
use duckdb::params_from_iter;
use duckdb::types::Value as SqlValue;
use duckdb::Connection;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use tracing::info;

/// Rows inserted per transaction unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Table '{0}' has no rows to load")]
    EmptyResult(String),

    #[error("Row {1} of table '{0}' has {2} values, expected {3}")]
    RowWidthError(String, usize, usize, usize),

    #[error("Batch size must be greater than zero")]
    BatchSizeError,
}

/// Answers yes/no questions asked before destructive or creating steps.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Answers every question with yes.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// What [`Loader::load`] did with one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Created { rows: usize },
    Skipped,
}

/// Writes extracted tables into a DuckDB database.
pub struct Loader {
    connection: Connection,
    batch_size: usize,
}

impl Loader {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Loader, RateTablesError> {
        let path = path.as_ref();
        let connection = Connection::open(path)
            .map_err(RateTablesError::from)
            .with_prefix(&format!("Open database '{}'", path.display()))?;
        Ok(Loader { connection, batch_size: DEFAULT_BATCH_SIZE })
    }

    pub fn in_memory() -> Result<Loader, RateTablesError> {
        let connection = Connection::open_in_memory()?;
        Ok(Loader { connection, batch_size: DEFAULT_BATCH_SIZE })
    }

    /// Sets the number of rows inserted per transaction.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Loader, RateTablesError> {
        if batch_size == 0 {
            Err(LoaderError::BatchSizeError)?
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Checks the catalog for a table, ignoring case as DuckDB does.
    pub fn table_exists(&self, name: &str) -> Result<bool, RateTablesError> {
        let count: i64 = self.connection.query_row(
            "SELECT count(*) FROM information_schema.tables WHERE lower(table_name) = lower(?)",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn drop_table(&self, name: &str) -> Result<(), RateTablesError> {
        info!("Dropping table '{}'", name);
        self.connection.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_identifier(name)))?;
        Ok(())
    }

    pub fn create_table(&self, schema: &TableSchema) -> Result<(), RateTablesError> {
        let sql = schema.create_sql();
        debug!("{}", sql);
        self.connection.execute_batch(&sql)
            .map_err(RateTablesError::from)
            .with_prefix(&format!("Create table '{}'", schema.name))?;
        Ok(())
    }

    /// Inserts every row of `result`, one transaction per batch.
    ///
    /// Returns the number of rows inserted.
    pub fn insert_rows(&mut self, schema: &TableSchema, result: &TabularResult) -> Result<usize, RateTablesError> {
        check_row_widths(schema, result)?;
        self.write_rows(schema, &result.rows, &[])
    }

    /// Runs `setup` and the first batch in one transaction, then the
    /// remaining batches in a transaction each.
    fn write_rows(&mut self, schema: &TableSchema, rows: &[Vec<Value>], setup: &[String]) -> Result<usize, RateTablesError> {
        let sql = schema.insert_sql();
        let batches: Vec<&[Vec<Value>]> = if rows.is_empty() {
            vec![rows]
        } else {
            rows.chunks(self.batch_size).collect()
        };
        let mut inserted = 0usize;
        for (number, batch) in batches.into_iter().enumerate() {
            let transaction = self.connection.transaction()?;
            if number == 0 {
                for statement in setup {
                    debug!("{}", statement);
                    transaction.execute_batch(statement)
                        .map_err(RateTablesError::from)
                        .with_prefix(&format!("Prepare table '{}'", schema.name))?;
                }
            }
            {
                let mut statement = transaction.prepare(&sql)?;
                for row in batch {
                    let values = row.iter()
                        .zip(&schema.columns)
                        .map(|(value, column)| to_sql_value(value, column.kind));
                    statement.execute(params_from_iter(values))?;
                }
            }
            transaction.commit()?;
            inserted += batch.len();
            debug!("Inserted batch {} of '{}' ({} rows so far)", number + 1, schema.name, inserted);
        }
        Ok(inserted)
    }

    /// Creates `name` from `result` and fills it.
    ///
    /// Asks before creating, and again before replacing an existing table;
    /// a "no" to either leaves the database untouched.
    ///
    /// Rows are checked before anything is written. Dropping the old table,
    /// creating the new one and inserting the first batch commit together, so
    /// a failure there keeps the old table. A failure in a later batch leaves
    /// the new table holding the batches committed before it.
    pub fn load(&mut self, name: &str, result: &TabularResult, confirm: &mut dyn Confirm) -> Result<LoadOutcome, RateTablesError> {
        if result.is_empty() {
            Err(LoaderError::EmptyResult(name.to_owned()))?
        }
        let schema = TableSchema::infer(name, result);
        check_row_widths(&schema, result)?;
        let question = format!("Create table '{}' with {} columns and {} rows?", name, schema.columns.len(), result.row_count());
        if !confirm.confirm(&question) {
            info!("Skipped table '{}'", name);
            return Ok(LoadOutcome::Skipped);
        }
        let mut setup = Vec::<String>::new();
        if self.table_exists(name)? {
            let question = format!("Table '{}' already exists. Drop and recreate it?", name);
            if !confirm.confirm(&question) {
                info!("Kept existing table '{}'", name);
                return Ok(LoadOutcome::Skipped);
            }
            info!("Replacing table '{}'", name);
            setup.push(schema.drop_sql());
        }
        setup.push(schema.create_sql());

        let rows = self.write_rows(&schema, &result.rows, &setup)?;
        info!("Loaded {} rows into '{}'", rows, name);
        Ok(LoadOutcome::Created { rows })
    }

    /// Counts the rows of a table.
    pub fn count_rows(&self, name: &str) -> Result<usize, RateTablesError> {
        let count: i64 = self.connection.query_row(
            &format!("SELECT count(*) FROM {}", quote_identifier(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn check_row_widths(schema: &TableSchema, result: &TabularResult) -> Result<(), RateTablesError> {
    let width = schema.columns.len();
    if let Some((index, row)) = result.rows.iter().enumerate().find(|(_, row)| row.len() != width) {
        Err(LoaderError::RowWidthError(schema.name.to_owned(), index + 1, row.len(), width))?
    }
    Ok(())
}

/// Converts a cell value into the parameter bound for a column of `kind`.
///
/// Timestamps are bound as text and cast by DuckDB on insert.
fn to_sql_value(value: &Value, kind: ColumnType) -> SqlValue {
    match (value, kind) {
        (Value::Null, _) => SqlValue::Null,
        (Value::Boolean(value), ColumnType::Boolean) => SqlValue::Boolean(*value),
        (Value::Number(value), ColumnType::BigInt) => SqlValue::BigInt(*value as i64),
        (Value::Number(value), ColumnType::Double) => SqlValue::Double(*value),
        (Value::DateTime(value), ColumnType::Timestamp) => SqlValue::Text(value.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        (Value::Text(value), _) => SqlValue::Text(value.to_owned()),
        (value, _) => SqlValue::Text(value.to_string()),
    }
}
