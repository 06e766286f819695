use crate::domains::export::filter::{CarFilters, UserFilters};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Entity kinds that can be exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Cars,
    Users,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Cars => "cars",
            ExportKind::Users => "users",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "cars" => Some(ExportKind::Cars),
            "users" => Some(ExportKind::Users),
            _ => None,
        }
    }

    /// Noun used in audit descriptions ("Экспорт автомобилей: ...")
    pub fn audit_noun(&self) -> &'static str {
        match self {
            ExportKind::Cars => "автомобилей",
            ExportKind::Users => "пользователей",
        }
    }
}

/// Export formats supported by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Excel,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "excel",
            ExportFormat::Json => "json",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Json => "application/json; charset=utf-8",
        }
    }
}

/// Body of an export call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest<F> {
    pub format: ExportFormat,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub filters: Option<F>,
}

/// A single exported cell
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Text(String),
    Integer(i64),
}

impl ExportValue {
    pub fn empty() -> Self {
        ExportValue::Text(String::new())
    }

    pub fn text<S: Into<String>>(value: S) -> Self {
        ExportValue::Text(value.into())
    }

    /// Missing values export as an empty string
    pub fn optional_text(value: Option<&str>) -> Self {
        ExportValue::Text(value.unwrap_or_default().to_string())
    }
}

impl fmt::Display for ExportValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportValue::Text(s) => f.write_str(s),
            ExportValue::Integer(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for ExportValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExportValue::Text(s) => serializer.serialize_str(s),
            ExportValue::Integer(n) => serializer.serialize_i64(*n),
        }
    }
}

/// One output row: requested fields in requested order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapedRecord {
    values: Vec<(&'static str, ExportValue)>,
}

impl ShapedRecord {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, field: &'static str, value: ExportValue) {
        self.values.push((field, value));
    }

    pub fn get(&self, field: &str) -> Option<&ExportValue> {
        self.values.iter().find(|(name, _)| *name == field).map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &ExportValue> {
        self.values.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for ShapedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (field, value) in &self.values {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// Finished export payload
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
    pub record_count: usize,
}

/// Query string of the preview endpoint: `type` plus the filters of either kind
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub location: Option<String>,
    pub seller_type: Option<String>,
    pub status: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub kilometers_min: Option<i64>,
    pub kilometers_max: Option<i64>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub role: Option<String>,
    pub email: Option<String>,
}

impl PreviewQuery {
    pub fn car_filters(&self) -> CarFilters {
        CarFilters {
            make: self.make.clone(),
            model: self.model.clone(),
            year: self.year.clone(),
            body_type: self.body_type.clone(),
            fuel_type: self.fuel_type.clone(),
            location: self.location.clone(),
            seller_type: self.seller_type.clone(),
            status: self.status.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            kilometers_min: self.kilometers_min,
            kilometers_max: self.kilometers_max,
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
        }
    }

    pub fn user_filters(&self) -> UserFilters {
        UserFilters {
            role: self.role.clone(),
            email: self.email.clone(),
        }
    }
}

/// Result of a preview: how many records an export would contain
#[derive(Debug, Clone, Serialize)]
pub struct PreviewResponse {
    pub count: u64,
    #[serde(rename = "type")]
    pub kind: ExportKind,
    pub filters_applied: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_rejected() {
        let parsed: Result<ExportRequest<UserFilters>, _> = serde_json::from_str(r#"{"format":"pdf"}"#);
        assert!(parsed.is_err());

        let parsed: ExportRequest<UserFilters> = serde_json::from_str(r#"{"format":"excel"}"#).unwrap();
        assert_eq!(parsed.format.file_extension(), "xlsx");
        assert!(parsed.fields.is_none());
    }

    #[test]
    fn test_shaped_record_serializes_in_field_order() {
        let mut record = ShapedRecord::default();
        record.push("title", ExportValue::text("Camry"));
        record.push("id", ExportValue::Integer(4));
        record.push("make", ExportValue::empty());

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"title":"Camry","id":4,"make":""}"#);
    }
}
