//! XLSX Workbook Module
//! Reads the first worksheet of a workbook and writes single-sheet workbooks.
//!
//! Writing uses direct ZIP/XML generation with inline strings, so no shared
//! string table or style part is produced. Reading understands shared strings,
//! inline strings, numbers and booleans; formulas are read as their cached value.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const FIRST_SHEET: &str = "xl/worksheets/sheet1.xml";
const SHEET_DIR: &str = "xl/worksheets/";

// Worksheet limits (last cell is XFD1048576)
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLUMNS: usize = 16_384;

#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a valid xlsx archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Malformed workbook XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Workbook has no worksheet")]
    NoWorksheet,
    #[error("Bad cell reference '{0}'")]
    BadReference(String),
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Cell content as text; numbers use their shortest form (`3`, `2.5`).
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Empty, Into::into)
    }
}

/// A worksheet whose first row holds the column names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Index of the column whose name equals `name`, ignoring case and padding.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c.trim().eq_ignore_ascii_case(name))
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows.get(row).and_then(|r| r.get(column)).unwrap_or(&EMPTY)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`.
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Zero-based `(row, column)` of an `A1` style reference.
pub fn parse_reference(reference: &str) -> Result<(usize, usize), XlsxError> {
    let bad = || XlsxError::BadReference(reference.to_string());
    let split = reference.find(|c: char| c.is_ascii_digit()).ok_or_else(bad)?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(bad());
    }
    let column = letters
        .to_ascii_uppercase()
        .bytes()
        .try_fold(0usize, |acc, b| acc.checked_mul(26)?.checked_add(usize::from(b - b'A' + 1)))
        .filter(|&c| c <= MAX_COLUMNS)
        .ok_or_else(bad)?;
    let row: usize = digits.parse().map_err(|_| bad())?;
    if row == 0 || row > MAX_ROWS {
        return Err(bad());
    }
    Ok((row - 1, column - 1))
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read the first worksheet of `path` as a [`Table`].
pub fn read_table(path: &Path) -> Result<Table, XlsxError> {
    let mut rows = read_rows(path)?
        .into_iter()
        .skip_while(|r| r.iter().all(Cell::is_empty));
    let columns = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|c| c.as_text().trim().to_string())
        .collect();
    let rows = rows.filter(|r| !r.iter().all(Cell::is_empty)).collect();
    Ok(Table { columns, rows })
}

/// All rows of the first worksheet, gaps filled with [`Cell::Empty`].
pub fn read_rows(path: &Path) -> Result<Vec<Vec<Cell>>, XlsxError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let shared = match read_part(&mut archive, SHARED_STRINGS) {
        Ok(xml) => parse_shared_strings(&xml)?,
        Err(XlsxError::Zip(zip::result::ZipError::FileNotFound)) => Vec::new(),
        Err(e) => return Err(e),
    };

    let sheet_name = if archive.file_names().any(|n| n == FIRST_SHEET) {
        FIRST_SHEET.to_string()
    } else {
        let mut sheets: Vec<&str> = archive
            .file_names()
            .filter(|n| n.starts_with(SHEET_DIR) && n.ends_with(".xml"))
            .collect();
        sheets.sort_unstable();
        sheets.first().ok_or(XlsxError::NoWorksheet)?.to_string()
    };
    let xml = read_part(&mut archive, &sheet_name)?;
    log::debug!("Reading {} from {}", sheet_name, path.display());
    parse_sheet(&xml, &shared)
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<String, XlsxError> {
    let mut part = archive.by_name(name)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, XlsxError> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `<si>` entries in order; rich-text runs are concatenated, phonetic runs skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Cell under construction while walking `<c>`.
#[derive(Default)]
struct PendingCell {
    column: usize,
    kind: Option<String>,
    value: String,
}

impl PendingCell {
    fn finish(self, shared: &[String]) -> Cell {
        let value = self.value;
        match self.kind.as_deref() {
            Some("s") => value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .map_or(Cell::Empty, |s| Cell::Text(s.clone())),
            Some("b") => Cell::Bool(value.trim() == "1"),
            Some("inlineStr") | Some("str") | Some("e") | Some("d") => Cell::Text(value),
            _ if value.trim().is_empty() => Cell::Empty,
            _ => value
                .trim()
                .parse::<f64>()
                .map_or_else(|_| Cell::Text(value.clone()), Cell::Number),
        }
    }
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<Cell>>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut row_index = 0usize;
    let mut next_column = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_index = match attribute(&e, b"r")? {
                        Some(r) => r
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .filter(|&r| (1..=MAX_ROWS).contains(&r))
                            .map(|r| r - 1)
                            .ok_or(XlsxError::BadReference(r))?,
                        None => rows.len(),
                    };
                    next_column = 0;
                }
                b"c" => cell = Some(start_cell(&e, next_column)?),
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                next_column = start_cell(&e, next_column)?.column + 1;
            }
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(c) = cell.take() {
                        let column = c.column;
                        next_column = column + 1;
                        let value = c.finish(shared);
                        if value != Cell::Empty {
                            if rows.len() <= row_index {
                                rows.resize_with(row_index + 1, Vec::new);
                            }
                            let row = &mut rows[row_index];
                            if row.len() <= column {
                                row.resize(column + 1, Cell::Empty);
                            }
                            row[column] = value;
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn start_cell(e: &BytesStart<'_>, next_column: usize) -> Result<PendingCell, XlsxError> {
    let column = match attribute(e, b"r")? {
        Some(reference) => parse_reference(&reference)?.1,
        None if next_column < MAX_COLUMNS => next_column,
        None => return Err(XlsxError::BadReference(format!("column {}", next_column + 1))),
    };
    Ok(PendingCell {
        column,
        kind: attribute(e, b"t")?,
        value: String::new(),
    })
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write `table` as a single-sheet workbook named `sheet_name`.
pub fn write_table(path: &Path, table: &Table, sheet_name: &str) -> Result<(), XlsxError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types_xml().as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(rels_xml().as_bytes())?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(sheet_name).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels_xml().as_bytes())?;

    zip.start_file(FIRST_SHEET, options)?;
    zip.write_all(sheet_xml(table).as_bytes())?;

    zip.finish()?;
    log::info!("Wrote {} rows to {}", table.height(), path.display());
    Ok(())
}

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#
}

fn rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
}

fn workbook_xml(sheet_name: &str) -> String {
    // Excel limits sheet names to 31 characters.
    let name: String = sheet_name.chars().take(31).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
        escape_xml(&name)
    )
}

fn workbook_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#
}

fn sheet_xml(table: &Table) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let header: Vec<Cell> = table.columns.iter().map(|c| Cell::Text(c.clone())).collect();
    for (r, row) in std::iter::once(&header).chain(&table.rows).enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letters(c), r + 1);
            match cell {
                Cell::Empty => {}
                Cell::Number(n) if !n.is_finite() => {}
                Cell::Number(n) => xml.push_str(&format!(r#"<c r="{reference}"><v>{n}</v></c>"#)),
                Cell::Bool(b) => {
                    xml.push_str(&format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*b)))
                }
                Cell::Text(s) => xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape_xml(s)
                )),
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}
