use crate::error::RateTablesError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::relationships_path;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::row_to_index;
use crate::spreadsheet::sheet::Region;
use crate::spreadsheet::SpreadsheetError;
use crate::table::range::CellRange;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts"; // Custom number formats container
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt";   // Individual custom number format
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs";  // Cell format indexes container
const TAG_FORMAT_INDEX: &[u8] = b"xf";         // Individual cell format index
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";   // Shared string table item
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";       // Phonetic text for Asian languages
const TAG_TEXT: &[u8] = b"t";                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr"; // Workbook properties
const TAG_SHEET: &[u8] = b"sheet";             // Worksheet definition
const TAG_ROW: &[u8] = b"row";                 // Row in worksheet
const TAG_CELL: &[u8] = b"c";                  // Cell in worksheet
const TAG_INLINE_STRING: &[u8] = b"is";        // Inline string value
const TAG_VALUE: &[u8] = b"v";                 // Cell value content
const TAG_TABLE: &[u8] = b"table";                    // Root of a table-definition part

/// Archive entries holding table definitions.
pub(crate) const TABLE_PART_PATTERN: &str = "xl/tables/table*.xml";

/// A worksheet listed in the workbook part
#[derive(Clone, Debug)]
pub(crate) struct Worksheet {
    pub(crate) name: String,
    pub(crate) path: String,
}

/// A table-definition part as declared in the archive
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TablePart {
    /// Part path inside the archive
    pub(crate) path: String,
    /// Table name (`name`, or `displayName` when `name` is missing)
    pub(crate) name: String,
    /// Raw `ref` attribute, e.g. `A1:G33`
    pub(crate) reference: String,
    /// Name of the worksheet whose relationships reference this part
    pub(crate) sheet: Option<String>,
}

/// Represents an opened xlsx workbook
pub(crate) struct XlsxWorkbook {
    /// File name of the workbook
    pub(crate) name: String,
    /// ZIP archive containing the package parts
    zip: ZipArchive<BufReader<File>>,
    /// Parsed number formats for cell type detection, indexed by style id
    number_formats: Vec<CellType>,
    /// Worksheets in workbook order
    sheets: Vec<Worksheet>,
}

impl XlsxWorkbook {
    /// Opens an xlsx workbook and parses its structure
    ///
    /// # Arguments
    /// * `path` - Path to the xlsx file
    pub(crate) fn open(path: &Path) -> Result<XlsxWorkbook, RateTablesError> {
        let name = path.display().to_string();
        let file = File::open(path)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        let (sheets, is_1904) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        Ok(XlsxWorkbook {
            name,
            zip,
            number_formats,
            sheets,
        })
    }

    /// Names of all worksheets in workbook order
    pub(crate) fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.to_owned()).collect()
    }

    /// Finds a worksheet by exact name, then case-insensitively
    pub(crate) fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets.iter()
            .find(|sheet| sheet.name == name)
            .or_else(|| self.sheets.iter().find(|sheet| sheet.name.eq_ignore_ascii_case(name)))
    }

    /// Parses every table-definition part, in lexicographic part order, and
    /// attributes each one to the worksheet that references it
    pub(crate) fn table_parts(&mut self) -> Result<Vec<TablePart>, RateTablesError> {
        let paths = self.zip.file_names_matching(TABLE_PART_PATTERN)?;
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut owners = HashMap::<String, String>::new();
        for sheet in &self.sheets {
            let rels = relationships_path(&sheet.path);
            if let Some(relationships) = load_relationships(&mut self.zip, &rels, excel::TABLE_RELATIONSHIP)? {
                for target in relationships.into_values() {
                    owners.entry(target.to_ascii_lowercase()).or_insert_with(|| sheet.name.to_owned());
                }
            }
        }

        let mut tables = Vec::with_capacity(paths.len());
        for path in paths {
            let (name, reference) = self.read_table_part(&path)?;
            let sheet = owners.get(&path.to_ascii_lowercase()).cloned();
            tables.push(TablePart { path, name, reference, sheet });
        }
        Ok(tables)
    }

    /// Reads the `name` and `ref` attributes of a table part's root element
    fn read_table_part(&mut self, path: &str) -> Result<(String, String), RateTablesError> {
        let mut reader = self.zip.xml_reader(path)?
            .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_TABLE => {
                let name = match event.get_attribute_value("name")? {
                    Some(name) => name,
                    None => event.require_attribute_value("displayName")?,
                };
                let reference = event.require_attribute_value("ref")?;
                return Ok((name.into_owned(), reference.into_owned()));
            }
        });
        Err(SpreadsheetError::TableDefinitionError(path.to_owned()))?
    }

    /// Reads the cells of one worksheet inside a bounded range
    ///
    /// Rows arrive in order, so reading stops at the first row past the range.
    /// Shared strings are resolved afterwards, loading only the referenced items.
    pub(crate) fn read_region(&mut self, sheet_name: &str, range: &CellRange) -> Result<Region, RateTablesError> {
        let sheet = self.sheet(sheet_name)
            .cloned()
            .ok_or_else(|| SpreadsheetError::SheetNotFoundError(self.name.to_owned(), sheet_name.to_owned()))?;
        let mut region = Region::new(
            &self.name,
            &sheet.name,
            (range.start_row - 1, range.start_column),
            (range.end_row - 1, range.end_column),
        );

        let mut shared_indexes = HashSet::<usize>::new();
        let mut row_cursor = 0usize;
        let mut col_cursor = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self.zip.xml_reader(&sheet.path)?
            .ok_or_else(|| SpreadsheetError::FileError(sheet.path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                row_cursor = event.get_attribute_value("r")?
                    .and_then(|r| row_to_index(&r))
                    .unwrap_or(row_cursor);
                col_cursor = 0;
                if region.after_row_upper_bound(row_cursor) {
                    break;
                }
            }
            Event::End(event) if event.local_name().as_ref() == TAG_ROW => {
                row_cursor += 1;
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_cursor, col_cursor));
                col_cursor = col + 1;
                value.clear();
                if region.contains(row, col) {
                    kind = event.get_attribute_value("t")?.map(|t| {
                        match t.as_ref() {
                            "inlineStr" | "str" => CellType::InlineString,
                            "s" => CellType::SharedString,
                            "d" => CellType::IsoDateTime,
                            "b" => CellType::Boolean,
                            "e" => CellType::Error,
                            _ => CellType::Number,
                        }
                    }).unwrap_or(CellType::Number);
                    if let Some(format_id) = event.get_attribute_value("s")? {
                        if kind == CellType::Number && !format_id.is_empty() {
                            let index = format_id.parse::<usize>()?;
                            kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                        }
                    }
                } else {
                    kind = CellType::default();
                }
            }
            Event::Start(event) if kind != CellType::Empty && event.local_name().as_ref() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind != CellType::Empty && event.local_name().as_ref() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if kind != CellType::Empty && event.local_name().as_ref() == TAG_CELL => {
                if !value.is_empty() {
                    if kind == CellType::SharedString {
                        shared_indexes.insert(value.trim().parse::<usize>()?);
                    }
                    region.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
                kind = CellType::default();
            }
        });
        drop(reader);

        if !shared_indexes.is_empty() {
            let (shared_strings, mappings) = self.load_shared_strings(Some(shared_indexes))?;
            for cell in region.cells_mut().filter(|cell| cell.kind == CellType::SharedString) {
                let index = cell.value.trim().parse::<usize>()?;
                let string = mappings.get(&index)
                    .and_then(|position| shared_strings.get(*position))
                    .ok_or_else(|| SpreadsheetError::SharedStringError(cell.reference(), index))?;
                cell.value = string.to_owned();
            }
        }
        Ok(region)
    }

    /// Loads shared strings from the workbook
    ///
    /// # Arguments
    /// * `indexes` - Optional set of specific string indexes to load, or None to load all
    ///
    /// # Returns
    /// Tuple of (shared_strings, mappings) where mappings maps original indexes to loaded positions
    fn load_shared_strings(&mut self, mut indexes: Option<HashSet<usize>>) -> Result<(Vec<String>, HashMap<usize, usize>), RateTablesError> {
        let mut shared_strings = Vec::<String>::new();
        let mut mappings = HashMap::<usize, usize>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok((shared_strings, mappings)),
        };

        let mut id = 0usize;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
                if let Some(keys) = &mut indexes {
                    if keys.remove(&id) {
                        let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                        mappings.insert(id, shared_strings.len());
                        shared_strings.push(string);
                    }
                    if keys.is_empty() {
                        break;
                    }
                } else {
                    let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                    mappings.insert(id, shared_strings.len());
                    shared_strings.push(string);
                }
                id += 1;
            }
        });
        Ok((shared_strings, mappings))
    }
}

/// Loads worksheet names and paths, and the date system, from the workbook part
fn load_workbook(zip: &mut ZipArchive<BufReader<File>>) -> Result<(Vec<Worksheet>, bool), RateTablesError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels", excel::WORKSHEET_RELATIONSHIP)?
        .ok_or_else(|| SpreadsheetError::FileError("xl/_rels/workbook.xml.rels".to_string()))?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<Worksheet> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push(Worksheet { name: name.into_owned(), path: path.to_owned() });
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats and cell styles from the styles part
///
/// Parses custom number formats and cell style indexes to determine
/// which numeric cells hold dates and times.
fn load_number_formats(zip: &mut ZipArchive<BufReader<File>>, is_1904: bool) -> Result<Vec<CellType>, RateTablesError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let style = CellType::parse_custom_number_format(&format, is_1904);
                custom_formats.insert(id.to_string(), style);
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?
                .map(|id| id.into_owned())
                .unwrap_or_else(|| "0".to_owned());
            format_indexes.push(id);
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Skips phonetic text annotations; `is_text_content` treats bare text as the
/// value (as in `<v>`), otherwise only `<t>` runs are collected.
fn read_string_value<R: Read>(
    reader: &mut XmlReader<BufReader<R>>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<String, RateTablesError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
