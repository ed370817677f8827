//! Minimal reader for Office Open XML spreadsheets (`.xlsx`).
//!
//! Only cell values are read: no styles, no formulas beyond their cached
//! results, no dates. That is all the survey export contains.
//!
//! An `.xlsx` file is a ZIP archive. The reader follows
//! `xl/workbook.xml` → `xl/_rels/workbook.xml.rels` to find the worksheet
//! part for a sheet name, loads `xl/sharedStrings.xml` when present, and
//! then walks the `<row>`/`<c>` elements of the worksheet.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use crate::error::{Error, Result};

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";

/// Columns per sheet, `A` through `XFD`.
const MAX_COLUMNS: usize = 16_384;

/// A worksheet: the first row as header, the remaining rows as data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    /// Index of the column with the given header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value, `None` for empty or missing cells.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }
}

/// Read one sheet of an `.xlsx` file from disk.
pub fn read_sheet_file<P: AsRef<Path>>(path: P, sheet_name: &str) -> Result<Sheet> {
    let file = std::fs::File::open(path)?;
    read_sheet(file, sheet_name)
}

/// Read one sheet of an `.xlsx` archive from any [`Read`] + [`Seek`] source.
pub fn read_sheet<R: Read + Seek>(reader: R, sheet_name: &str) -> Result<Sheet> {
    let mut archive = ZipArchive::new(reader)?;

    let workbook = read_archive_file(&mut archive, WORKBOOK)?;
    let sheets = parse_workbook(&workbook)?;
    let Some((_, rel_id)) = sheets.iter().find(|(name, _)| name == sheet_name) else {
        let available: Vec<&str> = sheets.iter().map(|(name, _)| name.as_str()).collect();
        return Err(Error::MissingSheet(format!(
            "{sheet_name} (available: {})",
            available.join(", ")
        )));
    };

    let rels = read_archive_file(&mut archive, WORKBOOK_RELS)?;
    let targets = parse_relationships(&rels)?;
    let target = targets.get(rel_id).ok_or_else(|| {
        Error::InvalidSpreadsheet(format!("no relationship {rel_id} for sheet {sheet_name}"))
    })?;
    let sheet_path = resolve_target(target);

    let shared = if archive.file_names().any(|name| name == SHARED_STRINGS) {
        parse_shared_strings(&read_archive_file(&mut archive, SHARED_STRINGS)?)?
    } else {
        Vec::new()
    };

    let worksheet = read_archive_file(&mut archive, &sheet_path)?;
    let mut rows = parse_worksheet(&worksheet, &shared)?.into_iter();

    let headers = rows
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();

    Ok(Sheet {
        headers,
        rows: rows.collect(),
    })
}

/// Returns `(sheet name, relationship id)` pairs in workbook order.
fn parse_workbook(content: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if local_name(e.name().as_ref()) == b"sheet" => {
                let name = attribute(&e, b"name")?;
                let id = attribute(&e, b"id")?;
                if let (Some(name), Some(id)) = (name, id) {
                    sheets.push((name, id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(sheets)
}

/// Returns relationship id → target.
fn parse_relationships(content: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(targets)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn parse_shared_strings(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic hints (<rPh>) repeat text that is not part of the value.
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"si" => current.clear(),
                b"t" if !in_phonetic => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if local_name(e.name().as_ref()) == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(e)) if in_text => {
                current.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::CData(e)) if in_text => {
                current.push_str(&String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(e)) if in_text => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    current.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(strings)
}

/// Cell being read inside a `<c>` element.
struct PendingCell {
    column: usize,
    kind: CellKind,
    value: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    /// Formula string results and error values are taken verbatim.
    Literal,
}

impl CellKind {
    fn from_attr(t: Option<&str>) -> Self {
        match t {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("b") => CellKind::Boolean,
            Some("str") | Some("e") => CellKind::Literal,
            _ => CellKind::Number,
        }
    }
}

fn parse_worksheet(content: &str, shared: &[String]) -> Result<Vec<Vec<Option<String>>>> {
    let mut reader = Reader::from_str(content);
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut row: Option<Vec<Option<String>>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"row" => row = Some(Vec::new()),
                b"c" => {
                    let next = row.as_ref().map_or(0, Vec::len);
                    cell = Some(start_cell(&e, next)?);
                }
                // <v> for plain cells, <t> inside <is> for inline strings
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Ok(Event::Empty(e)) => match local_name(e.name().as_ref()) {
                b"row" => rows.push(Vec::new()),
                // A valueless cell still takes up its column.
                b"c" => {
                    if let Some(row) = row.as_mut() {
                        let column = start_cell(&e, row.len())?.column;
                        if row.len() <= column {
                            row.resize(column + 1, None);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_value => {
                if let Some(cell) = cell.as_mut() {
                    cell.value.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) if in_value => {
                if let Some(cell) = cell.as_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    cell.value.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(done), Some(row)) = (cell.take(), row.as_mut()) {
                        let column = done.column;
                        let value = finish_cell(done, shared)?;
                        if row.len() <= column {
                            row.resize(column + 1, None);
                        }
                        row[column] = value;
                    }
                }
                b"row" => {
                    if let Some(done) = row.take() {
                        rows.push(done);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(rows)
}

fn start_cell(e: &BytesStart<'_>, next_column: usize) -> Result<PendingCell> {
    let column = match attribute(e, b"r")? {
        Some(reference) => column_index(&reference).ok_or_else(|| {
            Error::InvalidSpreadsheet(format!("bad cell reference {reference}"))
        })?,
        None => next_column,
    };
    let kind = CellKind::from_attr(attribute(e, b"t")?.as_deref());
    Ok(PendingCell {
        column,
        kind,
        value: String::new(),
    })
}

fn finish_cell(cell: PendingCell, shared: &[String]) -> Result<Option<String>> {
    if cell.value.is_empty() {
        return Ok(None);
    }

    let value = match cell.kind {
        CellKind::SharedString => {
            let index: usize = cell.value.trim().parse().map_err(|_| {
                Error::InvalidSpreadsheet(format!("bad shared string index {}", cell.value))
            })?;
            shared.get(index).cloned().ok_or_else(|| {
                Error::InvalidSpreadsheet(format!("shared string {index} out of range"))
            })?
        }
        CellKind::Boolean => match cell.value.trim() {
            "1" => "TRUE".to_string(),
            _ => "FALSE".to_string(),
        },
        CellKind::Number | CellKind::InlineString | CellKind::Literal => cell.value,
    };

    Ok((!value.is_empty()).then_some(value))
}

/// Zero-based column index of a cell reference such as `AB12`.
///
/// `None` for references without column letters or past the last column.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for b in letters {
        index = index
            .checked_mul(26)?
            .checked_add((b.to_ascii_uppercase() - b'A') as usize + 1)?;
        if index > MAX_COLUMNS {
            return None;
        }
    }
    Some(index - 1)
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == name {
            let raw = String::from_utf8(attr.value.to_vec())?;
            let value = quick_xml::escape::unescape(&raw)
                .map(|v| v.into_owned())
                .unwrap_or(raw);
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn read_archive_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive.by_name(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8(strip_bom(&bytes).to_vec())?)
}

fn strip_bom(data: &[u8]) -> &[u8] {
    // UTF-8 BOM: EF BB BF
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Extract local name from potentially namespaced XML name
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    code.and_then(char::from_u32).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Sheet1" sheetId="1" r:id="rId1"/>
    <sheet name="Q&amp;A" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

    const SHARED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>Subject</t></si>
  <si><t xml:space="preserve">Spin &amp; motion </t></si>
  <si><r><t>rich </t></r><r><t>text</t></r><rPh><t>ignored</t></rPh></si>
  <si/>
</sst>"#;

    const SHEET1_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>Score</t></is></c><c r="D1" t="inlineStr"><is><t>Flag</t></is></c></row>
    <row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2"><v>5.5</v></c><c r="D2" t="b"><v>1</v></c></row>
    <row r="3"><c r="A3" t="s"><v>2</v></c><c r="C3" s="1"/><c r="D3" t="str"><v>x&lt;y</v></c></row>
  </sheetData>
</worksheet>"#;

    const SHEET2_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="inlineStr"><is><t>Only</t></is></c></row>
  </sheetData>
</worksheet>"#;

    fn workbook(with_shared: bool) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut parts = vec![
            ("xl/workbook.xml", WORKBOOK_XML),
            ("xl/_rels/workbook.xml.rels", RELS_XML),
            ("xl/worksheets/sheet1.xml", SHEET1_XML),
            ("xl/worksheets/sheet2.xml", SHEET2_XML),
        ];
        if with_shared {
            parts.push(("xl/sharedStrings.xml", SHARED_XML));
        }
        for (name, content) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_sheet_values() {
        let sheet = read_sheet(Cursor::new(workbook(true)), "Sheet1").unwrap();
        assert_eq!(sheet.headers, vec!["Subject", "Score", "", "Flag"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.cell(0, 0), Some("Spin & motion "));
        assert_eq!(sheet.cell(0, 1), Some("5.5"));
        assert_eq!(sheet.cell(0, 2), None);
        assert_eq!(sheet.cell(0, 3), Some("TRUE"));
        assert_eq!(sheet.cell(1, 0), Some("rich text"));
        assert_eq!(sheet.cell(1, 2), None);
        assert_eq!(sheet.cell(1, 3), Some("x<y"));
    }

    #[test]
    fn test_column_lookup() {
        let sheet = read_sheet(Cursor::new(workbook(true)), "Sheet1").unwrap();
        assert_eq!(sheet.column("Flag"), Some(3));
        assert_eq!(sheet.column("Missing"), None);
    }

    #[test]
    fn test_sheet_by_escaped_name_and_absolute_target() {
        let sheet = read_sheet(Cursor::new(workbook(false)), "Q&A").unwrap();
        assert_eq!(sheet.headers, vec!["Only"]);
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_missing_sheet_lists_available() {
        let err = read_sheet(Cursor::new(workbook(true)), "Sheet2").unwrap_err();
        match err {
            Error::MissingSheet(msg) => assert!(msg.contains("Sheet1, Q&A")),
            other => panic!("expected MissingSheet, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_string_out_of_range() {
        let shared = vec!["only".to_string()];
        let xml = r#"<worksheet><sheetData><row><c t="s"><v>3</v></c></row></sheetData></worksheet>"#;
        assert!(matches!(
            parse_worksheet(xml, &shared),
            Err(Error::InvalidSpreadsheet(_))
        ));
    }

    #[test]
    fn test_cells_without_reference_are_sequential() {
        let xml = r#"<worksheet><sheetData><row><c t="inlineStr"><is><t>a</t></is></c><c><v>2</v></c></row></sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(rows, vec![vec![Some("a".to_string()), Some("2".to_string())]]);
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AA10"), Some(26));
        assert_eq!(column_index("AB3"), Some(27));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD1"), Some(16_383));
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index("ZZZZZZ1"), None);
        assert_eq!(column_index("ZZZZZZZZZZZZZZ1"), None);
    }

    #[test]
    fn test_out_of_range_reference_is_an_error() {
        for reference in ["ZZZZZZ1", "ZZZZZZZZZZZZZZ1"] {
            let xml = format!(
                r#"<worksheet><sheetData><row><c r="{reference}"><v>1</v></c></row></sheetData></worksheet>"#
            );
            assert!(matches!(
                parse_worksheet(&xml, &[]),
                Err(Error::InvalidSpreadsheet(_))
            ));
        }
    }

    #[test]
    fn test_empty_cell_advances_column() {
        let xml = r#"<worksheet><sheetData><row><c><v>1</v></c><c s="1"/><c><v>3</v></c></row></sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(
            rows,
            vec![vec![Some("1".to_string()), None, Some("3".to_string())]]
        );
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            read_sheet(Cursor::new(b"plain text".to_vec()), "Sheet1"),
            Err(Error::Zip(_))
        ));
    }
}
