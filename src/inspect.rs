//! Copies the structural XML parts of a workbook out of its archive so they
//! can be read by hand when table discovery does something unexpected.
use crate::error::RateTablesError;
use crate::error::ResultMessage;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::SpreadsheetError;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use tracing::warn;
use zip::ZipArchive;

/// Default directory parts are unpacked into.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "excel_xml_files";

/// Parts every workbook is expected to carry.
const KEY_PARTS: [&str; 5] = [
    "xl/workbook.xml",
    "xl/_rels/workbook.xml.rels",
    "[Content_Types].xml",
    "docProps/app.xml",
    "docProps/core.xml",
];

/// Parts collected when present, in this order.
const OPTIONAL_PART_PATTERNS: [&str; 3] = [
    "xl/worksheets/sheet*",
    "xl/tables/table*",
    "xl/worksheets/_rels/*",
];

/// Parts written by [`unpack_parts`] and key parts the archive lacked.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnpackReport {
    pub extracted: Vec<String>,
    pub missing: Vec<String>,
}

/// Extracts the key parts of `workbook` under `output`, keeping their archive paths.
pub fn unpack_parts(workbook: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<UnpackReport, RateTablesError> {
    let (workbook, output) = (workbook.as_ref(), output.as_ref());
    info!("Extracting XML files from '{}'", workbook.display());
    let file = File::open(workbook)
        .map_err(RateTablesError::from)
        .with_prefix(&format!("Open workbook '{}'", workbook.display()))?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;
    info!("Found {} files in the archive", zip.len());

    let mut report = UnpackReport::default();
    let mut names = Vec::<String>::new();
    for part in KEY_PARTS {
        if zip.file(part)?.is_some() {
            names.push(part.to_owned());
        } else {
            warn!("'{}' not found in '{}'", part, workbook.display());
            report.missing.push(part.to_owned());
        }
    }
    for pattern in OPTIONAL_PART_PATTERNS {
        names.extend(zip.file_names_matching(pattern)?);
    }

    std::fs::create_dir_all(output)?;
    for name in names {
        let mut part = zip.file(&name)?
            .ok_or_else(|| SpreadsheetError::FileError(name.to_owned()))?;
        let relative = part.enclosed_name()
            .ok_or_else(|| SpreadsheetError::FileError(name.to_owned()))?;
        let target = output.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = File::create(&target)
            .map_err(RateTablesError::from)
            .with_prefix(&format!("Create '{}'", target.display()))?;
        std::io::copy(&mut part, &mut writer)?;
        info!("Extracted: {}", name);
        report.extracted.push(name);
    }
    info!("Extracted {} XML files to '{}'", report.extracted.len(), output.display());
    Ok(report)
}
