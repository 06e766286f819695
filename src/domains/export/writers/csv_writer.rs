use crate::domains::export::fields::FieldSpec;
use crate::domains::export::types::ShapedRecord;
use crate::domains::export::writers::RecordWriter;
use crate::errors::{DomainError, DomainResult};
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Lets spreadsheet apps detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Comma-separated output: BOM, label header, `\n` row terminator
pub struct CsvWriter;

impl RecordWriter for CsvWriter {
    fn write(&self, fields: &[FieldSpec], records: &[ShapedRecord]) -> DomainResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(UTF8_BOM.len() + 64 * (records.len() + 1));
        buffer.extend_from_slice(UTF8_BOM);

        let mut builder = WriterBuilder::new();
        builder
            .delimiter(b',')
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'));

        let mut wtr = builder.from_writer(buffer);
        wtr.write_record(fields.iter().map(|field| field.label))
            .map_err(|e| DomainError::Serialization(e.to_string()))?;

        for record in records {
            let cells: Vec<String> = record.values().map(|value| value.to_string()).collect();

            // csv writes a lone empty field as `""`; an empty single-column row stays a bare line
            if matches!(cells.as_slice(), [cell] if cell.is_empty()) {
                let mut inner = wtr.into_inner().map_err(|e| DomainError::Internal(e.to_string()))?;
                inner.push(b'\n');
                wtr = builder.from_writer(inner);
                continue;
            }

            wtr.write_record(&cells)
                .map_err(|e| DomainError::Serialization(e.to_string()))?;
        }

        wtr.into_inner().map_err(|e| DomainError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::types::ExportValue;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec { name: "id", label: "ID" },
        FieldSpec { name: "body_type", label: "Тип кузова" },
        FieldSpec { name: "title", label: "Название" },
    ];

    fn record(id: i64, body: &str, title: &str) -> ShapedRecord {
        let mut record = ShapedRecord::default();
        record.push("id", ExportValue::Integer(id));
        record.push("body_type", ExportValue::text(body));
        record.push("title", ExportValue::text(title));
        record
    }

    #[test]
    fn test_bom_header_and_quoting() {
        let records = vec![
            record(1, "Sedan, 4-door", "He said \"hi\""),
            record(2, "Hatchback", "Line\nbreak"),
        ];
        let bytes = CsvWriter.write(FIELDS, &records).unwrap();

        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert!(text.starts_with("ID,Тип кузова,Название\n"));
        assert!(text.contains("1,\"Sedan, 4-door\",\"He said \"\"hi\"\"\"\n"));
        assert!(!text.contains('\r'));

        let mut reader = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
        let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "Sedan, 4-door");
        assert_eq!(&rows[1][2], "Line\nbreak");
    }

    #[test]
    fn test_single_empty_column_is_unquoted() {
        let fields = [FieldSpec { name: "status", label: "Статус" }];
        let rows: Vec<ShapedRecord> = ["", "Продано", ""]
            .iter()
            .map(|status| {
                let mut record = ShapedRecord::default();
                record.push("status", ExportValue::text(*status));
                record
            })
            .collect();

        let bytes = CsvWriter.write(&fields, &rows).unwrap();
        assert_eq!(&bytes[UTF8_BOM.len()..], "Статус\n\nПродано\n\n".as_bytes());
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let bytes = CsvWriter.write(FIELDS, &[]).unwrap();
        assert_eq!(&bytes[UTF8_BOM.len()..], "ID,Тип кузова,Название\n".as_bytes());
    }
}
