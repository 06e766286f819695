//! Serializers turning shaped records into downloadable payloads.

pub mod csv_writer;
pub mod json_writer;
pub mod xlsx_writer;

use crate::domains::export::fields::FieldSpec;
use crate::domains::export::types::{ExportFormat, ShapedRecord};
use crate::errors::DomainResult;

pub use csv_writer::CsvWriter;
pub use json_writer::JsonWriter;
pub use xlsx_writer::XlsxWriter;

/// Serialize records in one export format
pub trait RecordWriter: Send + Sync {
    /// `fields` gives column order and header labels; every record carries exactly these fields
    fn write(&self, fields: &[FieldSpec], records: &[ShapedRecord]) -> DomainResult<Vec<u8>>;
}

pub fn writer_for(format: ExportFormat) -> Box<dyn RecordWriter> {
    match format {
        ExportFormat::Csv => Box::new(CsvWriter),
        ExportFormat::Excel => Box::new(XlsxWriter),
        ExportFormat::Json => Box::new(JsonWriter),
    }
}
