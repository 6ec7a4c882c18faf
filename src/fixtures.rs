//! Minimal xlsx packages assembled in memory for tests.
use crate::spreadsheet::reference::index_to_reference;
use quick_xml::escape::escape;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MAIN_NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_RELATIONSHIP_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// One worksheet cell as written into the fixture.
#[derive(Clone, Debug)]
pub(crate) enum FixtureCell {
    /// Shared string
    Text(&'static str),
    /// Inline string
    Inline(&'static str),
    Number(f64),
    Bool(bool),
    /// Serial number styled with the built-in short date format
    Date(f64),
    /// Formula with its cached numeric result
    Formula(&'static str, f64),
    /// Error value such as `#N/A`
    Error(&'static str),
    /// Cell element without a value
    Empty,
}

struct FixtureTable {
    sheet: Option<usize>,
    name: String,
    reference: String,
}

/// Builds an xlsx workbook part by part.
#[derive(Default)]
pub(crate) struct WorkbookBuilder {
    sheets: Vec<(String, Vec<Vec<FixtureCell>>)>,
    tables: Vec<FixtureTable>,
    prefixed: bool,
}

impl WorkbookBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sheet(mut self, name: &str, rows: Vec<Vec<FixtureCell>>) -> Self {
        self.sheets.push((name.to_owned(), rows));
        self
    }

    /// Declares a table on the sheet at `sheet` (0-based, in `sheet` call order).
    pub(crate) fn table(mut self, sheet: usize, name: &str, reference: &str) -> Self {
        self.tables.push(FixtureTable { sheet: Some(sheet), name: name.to_owned(), reference: reference.to_owned() });
        self
    }

    /// Declares a table part that no worksheet references.
    pub(crate) fn orphan_table(mut self, name: &str, reference: &str) -> Self {
        self.tables.push(FixtureTable { sheet: None, name: name.to_owned(), reference: reference.to_owned() });
        self
    }

    /// Writes worksheets, shared strings and styles with an `x:` namespace prefix.
    pub(crate) fn prefixed(mut self) -> Self {
        self.prefixed = true;
        self
    }

    /// Writes `workbook.xlsx` into a fresh temporary directory.
    pub(crate) fn write(self) -> (TempDir, PathBuf) {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("workbook.xlsx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, content) in self.parts() {
            zip.start_file(&name, SimpleFileOptions::default()).unwrap();
            let content = if self.prefixed && is_cell_part(&name) {
                prefix_elements(&content)
            } else {
                content
            };
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        (directory, path)
    }

    fn parts(&self) -> Vec<(String, String)> {
        let mut shared_strings = Vec::<&str>::new();
        for cell in self.sheets.iter().flat_map(|(_, rows)| rows.iter().flatten()) {
            if let FixtureCell::Text(text) = cell {
                if !shared_strings.contains(text) {
                    shared_strings.push(*text);
                }
            }
        }

        let mut parts = vec![
            ("[Content_Types].xml".to_owned(), self.content_types()),
            ("_rels/.rels".to_owned(), format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PACKAGE_RELATIONSHIP_NAMESPACE}"><Relationship Id="rId1" Type="{RELATIONSHIP_NAMESPACE}/officeDocument" Target="xl/workbook.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="{RELATIONSHIP_NAMESPACE}/extended-properties" Target="docProps/app.xml"/></Relationships>"#
            )),
            ("docProps/app.xml".to_owned(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>Microsoft Excel</Application></Properties>"#.to_owned()),
            ("docProps/core.xml".to_owned(), r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:creator>rates</dc:creator></cp:coreProperties>"#.to_owned()),
            ("xl/workbook.xml".to_owned(), self.workbook()),
            ("xl/_rels/workbook.xml.rels".to_owned(), self.workbook_relationships()),
            ("xl/styles.xml".to_owned(), format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{MAIN_NAMESPACE}"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#
            )),
            ("xl/sharedStrings.xml".to_owned(), format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NAMESPACE}" count="{0}" uniqueCount="{0}">{1}</sst>"#,
                shared_strings.len(),
                shared_strings.iter().map(|text| format!("<si><t>{}</t></si>", escape(*text))).collect::<String>(),
            )),
        ];

        for (index, (_, rows)) in self.sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", index + 1), worksheet(rows, &shared_strings)));
            let tables: Vec<(usize, &FixtureTable)> = self.numbered_tables()
                .filter(|(_, table)| table.sheet == Some(index))
                .collect();
            if !tables.is_empty() {
                let relationships: String = tables.iter()
                    .enumerate()
                    .map(|(position, (number, _))| format!(
                        r#"<Relationship Id="rId{}" Type="{RELATIONSHIP_NAMESPACE}/table" Target="../tables/table{}.xml"/>"#,
                        position + 1,
                        number,
                    ))
                    .collect();
                parts.push((
                    format!("xl/worksheets/_rels/sheet{}.xml.rels", index + 1),
                    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PACKAGE_RELATIONSHIP_NAMESPACE}">{relationships}</Relationships>"#),
                ));
            }
        }

        for (number, table) in self.numbered_tables() {
            parts.push((format!("xl/tables/table{number}.xml"), format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><table xmlns="{MAIN_NAMESPACE}" id="{number}" name="{0}" displayName="{0}" ref="{1}" totalsRowShown="0"><autoFilter ref="{1}"/></table>"#,
                escape(table.name.as_str()),
                table.reference,
            )));
        }
        parts
    }

    /// Tables with their part numbers, starting at 1 in declaration order.
    fn numbered_tables(&self) -> impl Iterator<Item = (usize, &FixtureTable)> {
        self.tables.iter().enumerate().map(|(index, table)| (index + 1, table))
    }

    fn content_types(&self) -> String {
        let sheets: String = (1..=self.sheets.len())
            .map(|number| format!(r#"<Override PartName="/xl/worksheets/sheet{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#))
            .collect();
        let tables: String = self.numbered_tables()
            .map(|(number, _)| format!(r#"<Override PartName="/xl/tables/table{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/>"#))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{sheets}{tables}</Types>"#
        )
    }

    fn workbook(&self) -> String {
        let sheets: String = self.sheets.iter()
            .enumerate()
            .map(|(index, (name, _))| format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, escape(name.as_str()), index + 1, index + 1))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NAMESPACE}" xmlns:r="{RELATIONSHIP_NAMESPACE}"><workbookPr/><sheets>{sheets}</sheets></workbook>"#
        )
    }

    fn workbook_relationships(&self) -> String {
        let count = self.sheets.len();
        let sheets: String = (1..=count)
            .map(|number| format!(r#"<Relationship Id="rId{number}" Type="{RELATIONSHIP_NAMESPACE}/worksheet" Target="worksheets/sheet{number}.xml"/>"#))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{PACKAGE_RELATIONSHIP_NAMESPACE}">{sheets}<Relationship Id="rId{}" Type="{RELATIONSHIP_NAMESPACE}/styles" Target="styles.xml"/><Relationship Id="rId{}" Type="{RELATIONSHIP_NAMESPACE}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#,
            count + 1,
            count + 2,
        )
    }
}

fn worksheet(rows: &[Vec<FixtureCell>], shared_strings: &[&str]) -> String {
    let mut data = String::new();
    for (row, cells) in rows.iter().enumerate() {
        data.push_str(&format!(r#"<row r="{}">"#, row + 1));
        for (col, cell) in cells.iter().enumerate() {
            let reference = index_to_reference(row, col);
            let element = match cell {
                FixtureCell::Text(text) => {
                    let index = shared_strings.iter().position(|shared| shared == text).unwrap_or_default();
                    format!(r#"<c r="{reference}" t="s"><v>{index}</v></c>"#)
                }
                FixtureCell::Inline(text) => format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(*text)),
                FixtureCell::Number(value) => format!(r#"<c r="{reference}"><v>{value}</v></c>"#),
                FixtureCell::Bool(value) => format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*value)),
                FixtureCell::Date(serial) => format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#),
                FixtureCell::Formula(formula, cached) => format!(r#"<c r="{reference}"><f>{}</f><v>{cached}</v></c>"#, escape(*formula)),
                FixtureCell::Error(error) => format!(r#"<c r="{reference}" t="e"><v>{}</v></c>"#, escape(*error)),
                FixtureCell::Empty => format!(r#"<c r="{reference}"/>"#),
            };
            data.push_str(&element);
        }
        data.push_str("</row>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NAMESPACE}" xmlns:r="{RELATIONSHIP_NAMESPACE}"><sheetData>{data}</sheetData></worksheet>"#
    )
}

fn is_cell_part(name: &str) -> bool {
    name.starts_with("xl/worksheets/sheet") || name == "xl/sharedStrings.xml" || name == "xl/styles.xml"
}

/// Moves every element of `xml` into the `x` namespace prefix.
fn prefix_elements(xml: &str) -> String {
    let tag = Regex::new(r"<(/?)([A-Za-z])").unwrap();
    tag.replace_all(xml, "<${1}x:${2}").replace(r#" xmlns=""#, r#" xmlns:x=""#)
}
