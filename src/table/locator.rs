use crate::config::Config;
use crate::error::RateTablesError;
use crate::error::ResultMessage;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use crate::table::range::CellRange;
use std::fmt::Display;
use std::path::Path;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

/// An Excel-defined table: its name, the sheet it lives on and its range in
/// absolute form (`$A$1:$G$33`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub sheet: String,
    pub range: String,
}

/// Why discovery fell back to the configured default table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// The workbook declares no table-definition parts
    NoTableParts,
    /// The workbook could not be opened or parsed
    Failed(String),
}

impl Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::NoTableParts => write!(f, "no table definitions found"),
            FallbackReason::Failed(message) => write!(f, "table discovery failed: {message}"),
        }
    }
}

/// Outcome of table discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discovery {
    /// Tables declared by the workbook, in part order
    Declared(Vec<TableDescriptor>),
    /// A single assumed table covering the configured default region
    Fallback {
        descriptor: TableDescriptor,
        reason: FallbackReason,
    },
}

impl Discovery {
    /// The descriptors to process; never empty.
    pub fn descriptors(&self) -> Vec<TableDescriptor> {
        match self {
            Discovery::Declared(tables) => tables.to_vec(),
            Discovery::Fallback { descriptor, .. } => vec![descriptor.to_owned()],
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Discovery::Fallback { .. })
    }
}

/// Rewrites a table `ref` such as `A1:G33` into `$A$1:$G$33`.
///
/// A single-cell `ref` covers that one cell. Anything unparsable is returned
/// unchanged so the range parser can reject it when the table is read.
pub fn normalize_reference(reference: &str) -> String {
    let reference = reference.trim();
    let parsed = if reference.contains(':') {
        CellRange::parse(reference)
    } else {
        CellRange::parse(&format!("{reference}:{reference}"))
    };
    match parsed {
        Ok(range) => range.to_absolute(),
        Err(error) => {
            warn!("Keeping table reference '{}' as is: {}", reference, error);
            reference.to_owned()
        }
    }
}

/// Lists the tables a workbook declares in its table-definition parts.
///
/// Parts are processed in lexicographic order. A table is placed on the sheet
/// that references it, or on the first sheet when no sheet does. Returns an
/// empty list when the workbook has no table parts.
pub fn find_tables(path: impl AsRef<Path>) -> Result<Vec<TableDescriptor>, RateTablesError> {
    let path = path.as_ref();
    let mut workbook = XlsxWorkbook::open(path)
        .with_prefix(&format!("Open workbook '{}'", path.display()))?;
    let first_sheet = workbook.sheet_names().into_iter().next().unwrap_or_default();
    let parts = workbook.table_parts()
        .with_prefix(&format!("Read table definitions of '{}'", path.display()))?;
    debug!("Found {} table definitions in '{}'", parts.len(), workbook.name);

    let tables = parts
        .into_iter()
        .map(|part| {
            let descriptor = TableDescriptor {
                name: part.name,
                sheet: part.sheet.unwrap_or_else(|| first_sheet.to_owned()),
                range: normalize_reference(&part.reference),
            };
            debug!("Table '{}' on '{}' at {} ({})", descriptor.name, descriptor.sheet, descriptor.range, part.path);
            descriptor
        })
        .collect();
    Ok(tables)
}

/// Discovers tables and applies the fallback policy.
///
/// With no declared tables the configured fallback descriptor is placed on the
/// first sheet matching a configured alias, else the first sheet. When the
/// workbook cannot be inspected at all, the configured fallback sheet is used.
/// Never fails: errors are logged and reported through [`FallbackReason`].
pub fn locate_tables(path: impl AsRef<Path>, config: &Config) -> Discovery {
    let path = path.as_ref();
    info!("Extracting table information from '{}'", path.display());
    match find_tables(path) {
        Ok(tables) if !tables.is_empty() => {
            info!("Found {} table definitions", tables.len());
            Discovery::Declared(tables)
        }
        Ok(_) => {
            let sheet = fallback_sheet(path, config);
            warn!("No table definitions found in '{}', assuming '{}' on '{}'", path.display(), config.fallback.name, sheet);
            Discovery::Fallback {
                descriptor: config.fallback_descriptor(&sheet),
                reason: FallbackReason::NoTableParts,
            }
        }
        Err(failure) => {
            error!("Error extracting table information: {}", failure);
            Discovery::Fallback {
                descriptor: config.fallback_descriptor(&config.fallback.sheet),
                reason: FallbackReason::Failed(failure.to_string()),
            }
        }
    }
}

fn fallback_sheet(path: &Path, config: &Config) -> String {
    match XlsxWorkbook::open(path) {
        Ok(workbook) => {
            let sheets = workbook.sheet_names();
            config.resolve_sheet(&sheets)
                .or_else(|| sheets.first().map(String::as_str))
                .unwrap_or(&config.fallback.sheet)
                .to_owned()
        }
        Err(_) => config.fallback.sheet.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::FixtureCell::*;
    use crate::fixtures::WorkbookBuilder;
    use pretty_assertions::assert_eq;

    fn descriptor(name: &str, sheet: &str, range: &str) -> TableDescriptor {
        TableDescriptor { name: name.to_owned(), sheet: sheet.to_owned(), range: range.to_owned() }
    }

    #[test]
    fn normalizes_references_to_absolute_form() {
        assert_eq!(normalize_reference("A1:G33"), "$A$1:$G$33");
        assert_eq!(normalize_reference("$B$2:D50"), "$B$2:$D$50");
        assert_eq!(normalize_reference("C7"), "$C$7:$C$7");
        assert_eq!(normalize_reference("bogus"), "bogus");
    }

    #[test]
    fn finds_declared_tables_in_part_order() {
        let (_directory, path) = WorkbookBuilder::new()
            .sheet("Rates", vec![vec![Text("Zip")]])
            .sheet("Factors", vec![vec![Text("Tier")]])
            .table(1, "Tiers", "A1:C12")
            .table(0, "USAddress", "A1:G5")
            .table(0, "Territories", "I1:J40")
            .write();

        assert_eq!(find_tables(&path).unwrap(), vec![
            descriptor("Tiers", "Factors", "$A$1:$C$12"),
            descriptor("USAddress", "Rates", "$A$1:$G$5"),
            descriptor("Territories", "Rates", "$I$1:$J$40"),
        ]);
    }

    #[test]
    fn orphan_table_parts_land_on_the_first_sheet() {
        let (_directory, path) = WorkbookBuilder::new()
            .sheet("Rates", vec![])
            .orphan_table("Loose", "B2:C3")
            .write();

        assert_eq!(find_tables(&path).unwrap(), vec![descriptor("Loose", "Rates", "$B$2:$C$3")]);
    }

    #[test]
    fn workbook_without_tables_yields_one_fallback() {
        let (_directory, path) = WorkbookBuilder::new()
            .sheet("Summary", vec![])
            .sheet("SUBMISSION_DATA", vec![])
            .write();
        let discovery = locate_tables(&path, &Config::default());

        assert_eq!(discovery, Discovery::Fallback {
            descriptor: descriptor("USAddress", "SUBMISSION_DATA", "$A$1:$G$33637"),
            reason: FallbackReason::NoTableParts,
        });
        assert_eq!(discovery.descriptors().len(), 1);
    }

    #[test]
    fn fallback_uses_first_sheet_without_alias_match() {
        let (_directory, path) = WorkbookBuilder::new().sheet("Sheet1", vec![]).write();
        let discovery = locate_tables(&path, &Config::default());

        assert_eq!(discovery.descriptors(), vec![descriptor("USAddress", "Sheet1", "$A$1:$G$33637")]);
    }

    #[test]
    fn unreadable_workbook_falls_back_to_configured_sheet() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("missing.xlsx");
        let discovery = locate_tables(&path, &Config::default());

        assert!(discovery.is_fallback());
        assert_eq!(discovery.descriptors(), vec![descriptor("USAddress", "RATE_DATA", "$A$1:$G$33637")]);
        match discovery {
            Discovery::Fallback { reason: FallbackReason::Failed(message), .. } => {
                assert!(message.contains("missing.xlsx"))
            }
            other => panic!("unexpected discovery {other:?}"),
        }
    }

    #[test]
    fn declared_tables_are_returned_unchanged() {
        let (_directory, path) = WorkbookBuilder::new()
            .sheet("Rates", vec![])
            .table(0, "USAddress", "A1:G5")
            .write();
        let discovery = locate_tables(&path, &Config::default());

        assert!(!discovery.is_fallback());
        assert_eq!(discovery, Discovery::Declared(vec![descriptor("USAddress", "Rates", "$A$1:$G$5")]));
    }
}
