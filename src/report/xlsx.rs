//! Minimal SpreadsheetML writer. Produces single-sheet workbooks with inline
//! strings, which is all the daily-log report needs.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("failed to serialize worksheet xml: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("failed to assemble xlsx package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Sparse grid of text cells. Rows and columns are 1-based, matching the
/// `A1` reference style.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: BTreeMap<u32, BTreeMap<u16, String>>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, row: u32, col: u16, value: impl Into<String>) {
        self.cells.entry(row).or_default().insert(col, value.into());
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&str> {
        self.cells
            .get(&row)
            .and_then(|cols| cols.get(&col))
            .map(String::as_str)
    }

    fn column_widths(&self) -> BTreeMap<u16, f64> {
        let mut widths = BTreeMap::new();
        for cols in self.cells.values() {
            for (col, value) in cols {
                let width = value.chars().count() as f64 + 2.0;
                let entry = widths.entry(*col).or_insert(width);
                if width > *entry {
                    *entry = width;
                }
            }
        }
        widths
    }
}

pub fn column_letter(col: u16) -> String {
    debug_assert!(col >= 1);
    let mut n = col as u32;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub fn cell_ref(row: u32, col: u16) -> String {
    format!("{}{}", column_letter(col), row)
}

/// Packages the sheet into a complete `.xlsx` file.
pub fn build_workbook(sheet_name: &str, sheet: &Sheet) -> Result<Vec<u8>, XlsxError> {
    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    archive.start_file("[Content_Types].xml", options)?;
    archive.write_all(CONTENT_TYPES.as_bytes())?;

    archive.start_file("_rels/.rels", options)?;
    archive.write_all(ROOT_RELS.as_bytes())?;

    archive.start_file("xl/workbook.xml", options)?;
    archive.write_all(&workbook_xml(sheet_name)?)?;

    archive.start_file("xl/_rels/workbook.xml.rels", options)?;
    archive.write_all(WORKBOOK_RELS.as_bytes())?;

    archive.start_file("xl/worksheets/sheet1.xml", options)?;
    archive.write_all(&worksheet_xml(sheet)?)?;

    let cursor = archive.finish()?;
    Ok(cursor.into_inner())
}

fn workbook_xml(sheet_name: &str) -> Result<Vec<u8>, XlsxError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut workbook = BytesStart::new("workbook");
    workbook.push_attribute(("xmlns", SPREADSHEET_NS));
    workbook.push_attribute(("xmlns:r", RELATIONSHIPS_NS));
    writer.write_event(Event::Start(workbook))?;

    writer.write_event(Event::Start(BytesStart::new("sheets")))?;
    let mut sheet = BytesStart::new("sheet");
    sheet.push_attribute(("name", sheet_name));
    sheet.push_attribute(("sheetId", "1"));
    sheet.push_attribute(("r:id", "rId1"));
    writer.write_event(Event::Empty(sheet))?;
    writer.write_event(Event::End(BytesEnd::new("sheets")))?;

    writer.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(writer.into_inner())
}

fn worksheet_xml(sheet: &Sheet) -> Result<Vec<u8>, XlsxError> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", SPREADSHEET_NS));
    writer.write_event(Event::Start(worksheet))?;

    let widths = sheet.column_widths();
    if !widths.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("cols")))?;
        for (col, width) in &widths {
            let mut element = BytesStart::new("col");
            let col = col.to_string();
            element.push_attribute(("min", col.as_str()));
            element.push_attribute(("max", col.as_str()));
            element.push_attribute(("width", format!("{width:.2}").as_str()));
            element.push_attribute(("customWidth", "1"));
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new("cols")))?;
    }

    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    for (row, cols) in &sheet.cells {
        let mut row_element = BytesStart::new("row");
        row_element.push_attribute(("r", row.to_string().as_str()));
        writer.write_event(Event::Start(row_element))?;

        for (col, value) in cols {
            let mut cell = BytesStart::new("c");
            cell.push_attribute(("r", cell_ref(*row, *col).as_str()));
            cell.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(cell))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            writer.write_event(Event::Start(BytesStart::new("t")))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;

    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner())
}

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
