use crate::spreadsheet::Value;
use crate::table::reader::TabularResult;

/// Largest magnitude an `f64` can have while still converting exactly to `i64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Column data types written to the database.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    /// Boolean values (true/false)
    Boolean,
    /// 64-bit signed integers
    BigInt,
    /// Double-precision floating point numbers
    Double,
    /// Date and time with microsecond precision
    Timestamp,
    /// Variable-length strings
    Varchar,
}

/// A named, typed column of a table about to be created.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    /// Sanitized column name
    pub name: String,
    /// Inferred column type
    pub kind: ColumnType,
}

impl ColumnType {
    /// Returns the SQL type name used in `CREATE TABLE`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// The narrowest type holding a single value; `None` for nulls.
    pub fn from(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Boolean(_) => Some(ColumnType::Boolean),
            Value::Number(number) if Self::is_integer(*number) => Some(ColumnType::BigInt),
            Value::Number(_) => Some(ColumnType::Double),
            Value::DateTime(_) => Some(ColumnType::Timestamp),
            Value::Text(_) => Some(ColumnType::Varchar),
        }
    }

    /// Checks if a number is integral and fits a BIGINT without losing precision.
    fn is_integer(number: f64) -> bool {
        number.is_finite() && number.fract() == 0.0 && number.abs() <= MAX_EXACT_INTEGER
    }

    /// Infers the column type of a sequence of values, ignoring nulls.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnType {
        Self::detect(values.into_iter().map(Self::from).collect())
    }

    /// Detects the most specific common type from a collection of candidate types.
    /// Falls back to VARCHAR if types are inconsistent or empty.
    pub fn detect(types: Vec<Option<ColumnType>>) -> ColumnType {
        let types: Vec<ColumnType> = types.into_iter().flatten().collect();
        if types.is_empty() {
            ColumnType::Varchar
        } else if types.iter().all(|kind| kind.is_boolean()) {
            ColumnType::Boolean
        } else if types.iter().all(|kind| kind.is_int()) {
            ColumnType::BigInt
        } else if types.iter().all(|kind| kind.is_float()) {
            ColumnType::Double
        } else if types.iter().all(|kind| kind.is_datetime()) {
            ColumnType::Timestamp
        } else {
            ColumnType::Varchar
        }
    }

    /// Returns true if this column type represents boolean values.
    #[inline]
    pub fn is_boolean(&self) -> bool {
        matches!(self, ColumnType::Boolean)
    }

    /// Returns true if this column type represents integer values.
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, ColumnType::BigInt)
    }

    /// Returns true if this column type represents numeric values (integer or floating point).
    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, ColumnType::BigInt | ColumnType::Double)
    }

    #[inline]
    pub fn is_datetime(&self) -> bool {
        matches!(self, ColumnType::Timestamp)
    }
}

impl Column {
    /// Infers one column per result column from the values below it.
    pub fn infer_all(result: &TabularResult) -> Vec<Column> {
        result.columns
            .iter()
            .enumerate()
            .map(|(index, name)| Column {
                name: name.to_owned(),
                kind: ColumnType::infer(result.rows.iter().filter_map(|row| row.get(index))),
            })
            .collect()
    }
}
