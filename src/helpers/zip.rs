//! ZIP archive helper utilities for packaged-XML workbooks (.xlsx)
//! Provides convenient methods for locating and reading parts within the archive

use crate::error::RateTablesError;
use crate::helpers::xml::XmlReader;
use glob::MatchOptions;
use glob::Pattern;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Part names inside a workbook are matched case-insensitively.
const PART_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Helper trait for ZIP archive operations
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, RateTablesError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, RateTablesError>;

    /// Lists the part names matching a glob pattern, in lexicographic order
    fn file_names_matching(&self, pattern: &str) -> Result<Vec<String>, RateTablesError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, RateTablesError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, RateTablesError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn file_names_matching(&self, pattern: &str) -> Result<Vec<String>, RateTablesError> {
        let pattern = Pattern::new(pattern)?;
        let mut names: Vec<String> = self.file_names()
            .filter(|file_name| pattern.matches_with(&file_name.replace('\\', "/"), PART_MATCH_OPTIONS))
            .map(|file_name| file_name.to_owned())
            .collect();
        names.sort();
        Ok(names)
    }
}
