//! Runtime configuration, loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! settings the rate-file workflow was built against.
use crate::error::RateTablesError;
use crate::table::locator::TableDescriptor;
use crate::table::range::CellRange;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Read config '{0}' failed: {1}")]
    ReadError(PathBuf, std::io::Error),

    #[error("Parse config '{0}' failed: {1}")]
    ParseError(PathBuf, toml::de::Error),

    #[error("Invalid config value '{0}': {1}")]
    ValueError(&'static str, String),
}

/// Descriptor used when a workbook declares no tables or cannot be inspected.
///
/// The defaults describe one specific rate workbook, not a general rule.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FallbackTable {
    pub name: String,
    /// Sheet used when the workbook itself could not be read
    pub sheet: String,
    pub range: String,
}

impl Default for FallbackTable {
    fn default() -> Self {
        FallbackTable {
            name: "USAddress".to_owned(),
            sheet: "RATE_DATA".to_owned(),
            range: "$A$1:$G$33637".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub fallback: FallbackTable,
    /// Accepted names of the data sheet, matched case-insensitively
    pub sheet_aliases: Vec<String>,
    /// Prefix of every database table created by the loader
    pub table_prefix: String,
    /// Rows inserted per transaction
    pub batch_size: usize,
    /// Rows shown in previews
    pub sample_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fallback: FallbackTable::default(),
            sheet_aliases: vec!["submission_data".to_owned(), "RATE_DATA".to_owned()],
            table_prefix: "Origin_EB_".to_owned(),
            batch_size: 1000,
            sample_rows: 3,
        }
    }
}

impl Config {
    /// Loads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Config, RateTablesError> {
        let text = std::fs::read_to_string(path)
            .map_err(|error| ConfigError::ReadError(path.to_owned(), error))?;
        let config = Self::parse(&text).map_err(|error| match error {
            RateTablesError::ConfigError(ConfigError::ParseError(_, error)) => {
                ConfigError::ParseError(path.to_owned(), error).into()
            }
            error => error,
        })?;
        Ok(config)
    }

    /// Loads the file when given, the defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, RateTablesError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }

    /// Parses and validates TOML text.
    pub fn parse(text: &str) -> Result<Config, RateTablesError> {
        let config: Config = toml::from_str(text)
            .map_err(|error| ConfigError::ParseError(PathBuf::new(), error))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ValueError("batch_size", "must be greater than zero".to_owned()));
        }
        if let Err(error) = CellRange::parse(&self.fallback.range) {
            return Err(ConfigError::ValueError("fallback.range", error.to_string()));
        }
        Ok(())
    }

    /// Picks the first sheet, in workbook order, whose name matches one of the
    /// accepted aliases ignoring case.
    pub fn resolve_sheet<'a>(&self, sheets: &'a [String]) -> Option<&'a str> {
        sheets
            .iter()
            .find(|sheet| self.sheet_aliases.iter().any(|alias| alias.eq_ignore_ascii_case(sheet)))
            .map(String::as_str)
    }

    /// The fallback descriptor placed on `sheet`.
    pub fn fallback_descriptor(&self, sheet: &str) -> TableDescriptor {
        TableDescriptor {
            name: self.fallback.name.to_owned(),
            sheet: sheet.to_owned(),
            range: self.fallback.range.to_owned(),
        }
    }
}
