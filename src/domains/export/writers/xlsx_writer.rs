//! Minimal single-sheet OOXML workbook.
//!
//! Every part is written with a fixed timestamp, so the same records always
//! produce the same bytes.

use crate::domains::export::fields::FieldSpec;
use crate::domains::export::types::{ExportValue, ShapedRecord};
use crate::domains::export::writers::RecordWriter;
use crate::errors::{DomainError, DomainResult};
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const SHEET_NAME: &str = "Data";
const MAX_COLUMN_WIDTH: usize = 50;
const COLUMN_PADDING: usize = 2;
const HEADER_ROW_HEIGHT: u32 = 20;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Style 0 is the default, style 1 is the bold header
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

pub struct XlsxWriter;

impl RecordWriter for XlsxWriter {
    fn write(&self, fields: &[FieldSpec], records: &[ShapedRecord]) -> DomainResult<Vec<u8>> {
        let parts: [(&str, String); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("xl/workbook.xml", workbook_xml()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/worksheets/sheet1.xml", sheet_xml(fields, records)),
            ("xl/styles.xml", STYLES.to_string()),
        ];

        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in &parts {
            zip.start_file(*name, options).map_err(package_error)?;
            zip.write_all(content.as_bytes())
                .map_err(|e| DomainError::Internal(format!("Failed to write {}: {}", name, e)))?;
        }

        let cursor = zip.finish().map_err(package_error)?;
        Ok(cursor.into_inner())
    }
}

fn package_error(err: zip::result::ZipError) -> DomainError {
    DomainError::Serialization(format!("Failed to build workbook: {}", err))
}

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        SHEET_NAME
    )
}

/// `min(max(label, longest value) + 2, 50)`, counted in characters
fn column_widths(fields: &[FieldSpec], records: &[ShapedRecord]) -> Vec<usize> {
    let mut widths: Vec<usize> = fields.iter().map(|field| field.label.chars().count()).collect();
    for record in records {
        for (width, value) in widths.iter_mut().zip(record.values()) {
            let len = match value {
                ExportValue::Text(s) => s.chars().count(),
                ExportValue::Integer(n) => n.to_string().len(),
            };
            *width = (*width).max(len);
        }
    }
    widths
        .into_iter()
        .map(|w| (w + COLUMN_PADDING).min(MAX_COLUMN_WIDTH))
        .collect()
}

/// Spreadsheet column name for a zero-based index: A..Z, AA..
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

fn push_text_cell(xml: &mut String, reference: &str, text: &str, style: Option<u32>) {
    let _ = write!(xml, r#"<c r="{}" t="inlineStr""#, reference);
    if let Some(style) = style {
        let _ = write!(xml, r#" s="{}""#, style);
    }
    let _ = write!(xml, r#"><is><t xml:space="preserve">{}</t></is></c>"#, escape_xml(text));
}

fn sheet_xml(fields: &[FieldSpec], records: &[ShapedRecord]) -> String {
    let columns: Vec<String> = (0..fields.len()).map(column_name).collect();
    let mut xml = String::with_capacity(256 + records.len() * fields.len() * 32);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#);

    if !fields.is_empty() {
        xml.push_str("<cols>");
        for (i, width) in column_widths(fields, records).into_iter().enumerate() {
            let _ = write!(xml, r#"<col min="{0}" max="{0}" width="{1}" customWidth="1"/>"#, i + 1, width);
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");

    let _ = write!(xml, r#"<row r="1" ht="{}" customHeight="1">"#, HEADER_ROW_HEIGHT);
    for (column, field) in columns.iter().zip(fields) {
        push_text_cell(&mut xml, &format!("{}1", column), field.label, Some(1));
    }
    xml.push_str("</row>");

    for (i, record) in records.iter().enumerate() {
        let row = i + 2;
        let _ = write!(xml, r#"<row r="{}">"#, row);
        for (column, value) in columns.iter().zip(record.values()) {
            let reference = format!("{}{}", column, row);
            match value {
                ExportValue::Integer(n) => {
                    let _ = write!(xml, r#"<c r="{}"><v>{}</v></c>"#, reference, n);
                }
                ExportValue::Text(s) => push_text_cell(&mut xml, &reference, s, None),
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Escape markup and drop characters XML 1.0 cannot carry
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => escaped.push(c),
        }
    }
    escaped
}
