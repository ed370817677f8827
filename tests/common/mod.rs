//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use exambot::compile::PdfBackend;
use exambot::{Error, Result};
use zip::write::SimpleFileOptions;

pub const HEADERS: [&str; 6] = [
    "Semester",
    "Examiner",
    "Summary",
    "Atmosphere",
    "Subject_itet",
    "Subject_phys",
];

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Build an `.xlsx` file with a single sheet of inline strings under
/// [`HEADERS`]. Empty cells are left out of the XML.
pub fn workbook(sheet_name: &str, rows: &[[&str; 6]]) -> Vec<u8> {
    let workbook_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        xml_escape(sheet_name)
    );

    let mut sheet_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in std::iter::once(&HEADERS).chain(rows).enumerate() {
        sheet_xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate().filter(|(_, v)| !v.is_empty()) {
            sheet_xml.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_letter(c),
                r + 1,
                xml_escape(value)
            ));
        }
        sheet_xml.push_str("</row>");
    }
    sheet_xml.push_str("</sheetData></worksheet>");

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("xl/workbook.xml", workbook_xml.as_str()),
        ("xl/_rels/workbook.xml.rels", RELS_XML),
        ("xl/worksheets/sheet1.xml", sheet_xml.as_str()),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Responses covering one itet and one phys subject.
pub fn sample_rows() -> [[&'static str; 6]; 3] {
    [
        [
            "Fall 2023",
            "Dr. Q",
            "Energy $E = mc^2$ was asked 👍",
            "relaxed",
            "",
            "Quantum Mechanics",
        ],
        ["Spring 2024", "Dr. S", "Fourier series", "", "Signals", ""],
        [
            "Fall 2023",
            "Dr. A",
            "50% of the time on proofs & lemmas",
            "tense",
            "",
            "Quantum Mechanics",
        ],
    ]
}

pub fn sample_workbook() -> Vec<u8> {
    workbook("Sheet2", &sample_rows())
}

/// Backend that returns a fake PDF naming the job.
pub struct FakePdf;

impl PdfBackend for FakePdf {
    fn compile(&self, stem: &str, _source: &str) -> Result<Vec<u8>> {
        Ok(format!("%PDF-1.5 {stem}").into_bytes())
    }
}

/// Backend that fails every job.
pub struct BrokenPdf;

impl PdfBackend for BrokenPdf {
    fn compile(&self, stem: &str, _source: &str) -> Result<Vec<u8>> {
        Err(Error::Compile {
            stem: stem.to_string(),
            log: "! Undefined control sequence.".to_string(),
        })
    }
}
