//! Office Open XML package helpers shared by the workbook reader and the table locator
use crate::error::RateTablesError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Relationship type suffix of a workbook → worksheet link
pub(crate) const WORKSHEET_RELATIONSHIP: &str = "/worksheet";

/// Relationship type suffix of a worksheet → table-definition link
pub(crate) const TABLE_RELATIONSHIP: &str = "/table";

/// Loads relationships of one kind from a `.rels` part
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships part within the archive
/// * `kind` - Suffix of the relationship `Type` to keep (e.g. `/worksheet`)
///
/// # Returns
/// Mapping of relationship IDs to resolved part paths, or `None` when the part is absent
pub(crate) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
    kind: &str,
) -> Result<Option<HashMap<String, String>>, RateTablesError> {
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(None),
    };
    let base = source_directory(path);
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let target = event.get_attribute_value("Target")?;
            let external = event.get_attribute_value("TargetMode")?
                .map(|mode| mode.eq_ignore_ascii_case("External"))
                .unwrap_or(false);
            let matches = event.get_attribute_value("Type")?
                .map(|it| it.ends_with(kind))
                .unwrap_or(true);
            if matches && !external {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), resolve_target(&base, &target));
                }
            }
        }
    });
    Ok(Some(relationships))
}

/// Returns the `.rels` part describing the relationships of `part`
/// (e.g. `xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`).
pub(crate) fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, file)) => format!("{directory}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Directory that relationship targets in a `.rels` part are relative to.
/// `xl/_rels/workbook.xml.rels` → `xl`, `_rels/.rels` → ``.
fn source_directory(rels_path: &str) -> String {
    let directory = rels_path.rsplit_once('/').map(|(directory, _)| directory).unwrap_or("");
    directory.strip_suffix("_rels")
        .unwrap_or(directory)
        .trim_end_matches('/')
        .to_owned()
}

/// Resolves a relationship target against its source directory into a zip path
///
/// Absolute targets (`/xl/tables/table1.xml`) are taken from the package root;
/// relative ones are joined to `base` with `..` segments collapsed.
pub(crate) fn resolve_target(base: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_owned(),
        None if base.is_empty() => target,
        None => format!("{base}/{target}"),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Maps format indexes to cell types using custom and built-in formats
///
/// # Arguments
/// * `format_indexes` - Number format id of each cell style, in style order
/// * `custom_formats` - Custom format mappings defined in the workbook
/// * `is_1904` - Whether the workbook uses the 1904 date system
pub(crate) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_targets() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/worksheets", "../tables/table1.xml"), "xl/tables/table1.xml");
        assert_eq!(resolve_target("xl/worksheets", "/xl/tables/table2.xml"), "xl/tables/table2.xml");
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn derives_relationship_part_paths() {
        assert_eq!(relationships_path("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
        assert_eq!(relationships_path("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(source_directory("xl/worksheets/_rels/sheet1.xml.rels"), "xl/worksheets");
        assert_eq!(source_directory("_rels/.rels"), "");
    }

    #[test]
    fn custom_formats_take_precedence_over_builtin_ids() {
        let custom = HashMap::from([("164".to_owned(), CellType::NumberDateTime1900)]);
        let formats = load_number_formats(
            vec!["0".to_owned(), "14".to_owned(), "164".to_owned(), "2".to_owned()],
            custom,
            false,
        );
        assert_eq!(formats, vec![
            CellType::Number,
            CellType::NumberDateTime1900,
            CellType::NumberDateTime1900,
            CellType::Number,
        ]);
    }
}
