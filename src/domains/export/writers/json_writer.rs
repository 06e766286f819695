use crate::domains::export::fields::FieldSpec;
use crate::domains::export::types::ShapedRecord;
use crate::domains::export::writers::RecordWriter;
use crate::errors::{DomainError, DomainResult};

/// Pretty-printed array of objects keyed by internal field names
pub struct JsonWriter;

impl RecordWriter for JsonWriter {
    fn write(&self, _fields: &[FieldSpec], records: &[ShapedRecord]) -> DomainResult<Vec<u8>> {
        serde_json::to_vec_pretty(records).map_err(|e| DomainError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::types::ExportValue;
    use serde_json::json;

    #[test]
    fn test_keys_follow_field_order() {
        let mut record = ShapedRecord::default();
        record.push("title", ExportValue::text("Camry"));
        record.push("id", ExportValue::Integer(9));
        record.push("status", ExportValue::empty());

        let bytes = JsonWriter.write(&[], &[record]).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.find("\"title\"").unwrap() < text.find("\"id\"").unwrap());

        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, json!([{"title": "Camry", "id": 9, "status": ""}]));
    }

    #[test]
    fn test_empty_export_is_empty_array() {
        let bytes = JsonWriter.write(&[], &[]).unwrap();
        assert_eq!(bytes, b"[]");
    }
}
