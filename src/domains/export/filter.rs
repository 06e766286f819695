//! Typed export filters and their translation into SQL predicates.
//!
//! Filters are validated as a whole before any SQL is produced; the resulting
//! [`Predicate`] is appended to a `QueryBuilder` with bound parameters only.

use crate::domains::export::types::ExportKind;
use crate::errors::DomainResult;
use crate::types::format_timestamp;
use crate::validation::{ensure_ordered, escape_like, parse_date_bound, DateBound, ValidationBuilder};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

/// A bindable SQL value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Case-insensitive, unanchored substring match
    Contains { column: &'static str, value: String },
    /// Case-insensitive equality
    EqIgnoreCase { column: &'static str, value: String },
    Eq { column: &'static str, value: SqlValue },
    Gte { column: &'static str, value: SqlValue },
    Lte { column: &'static str, value: SqlValue },
}

/// Conjunction of conditions; empty means "match everything"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append ` WHERE ...` (nothing when empty) to `builder`
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Contains { column, value } => {
                    builder
                        .push(format!("LOWER({}) LIKE LOWER(", column))
                        .push_bind(format!("%{}%", escape_like(value)))
                        .push(") ESCAPE '\\'");
                }
                Condition::EqIgnoreCase { column, value } => {
                    builder
                        .push(format!("LOWER({}) = LOWER(", column))
                        .push_bind(value.clone())
                        .push(")");
                }
                Condition::Eq { column, value } => {
                    builder.push(format!("{} = ", column));
                    bind_value(builder, value);
                }
                Condition::Gte { column, value } => {
                    builder.push(format!("{} >= ", column));
                    bind_value(builder, value);
                }
                Condition::Lte { column, value } => {
                    builder.push(format!("{} <= ", column));
                    bind_value(builder, value);
                }
            }
        }
    }
}

fn bind_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &SqlValue) {
    match value {
        SqlValue::Text(s) => builder.push_bind(s.clone()),
        SqlValue::Integer(n) => builder.push_bind(*n),
        SqlValue::Real(f) => builder.push_bind(*f),
    };
}

/// A per-entity filter set accepted by export and preview
pub trait ExportFilter: Serialize + Default + Send + Sync {
    const KIND: ExportKind;

    /// Same filters with blank strings dropped
    fn compact(self) -> Self;

    /// Validate every constraint, then build the predicate
    fn to_predicate(&self) -> DomainResult<Predicate>;

    /// Supplied filters only, as echoed back by preview
    fn applied(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|s| s.trim().to_string())
}

/// Filters for car listing exports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kilometers_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kilometers_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

impl ExportFilter for CarFilters {
    const KIND: ExportKind = ExportKind::Cars;

    fn compact(self) -> Self {
        Self {
            make: blank_to_none(self.make),
            model: blank_to_none(self.model),
            year: blank_to_none(self.year),
            body_type: blank_to_none(self.body_type),
            fuel_type: blank_to_none(self.fuel_type),
            location: blank_to_none(self.location),
            seller_type: blank_to_none(self.seller_type),
            status: blank_to_none(self.status),
            date_from: blank_to_none(self.date_from),
            date_to: blank_to_none(self.date_to),
            ..self
        }
    }

    fn to_predicate(&self) -> DomainResult<Predicate> {
        let filters = self.clone().compact();

        ValidationBuilder::new("price_min", filters.price_min).finite().min(0.0).validate()?;
        ValidationBuilder::new("price_max", filters.price_max).finite().min(0.0).validate()?;
        ValidationBuilder::new("kilometers_min", filters.kilometers_min).min(0).validate()?;
        ValidationBuilder::new("kilometers_max", filters.kilometers_max).min(0).validate()?;
        ensure_ordered(filters.price_min.as_ref(), filters.price_max.as_ref(), "price_min", "price_max")?;
        ensure_ordered(
            filters.kilometers_min.as_ref(),
            filters.kilometers_max.as_ref(),
            "kilometers_min",
            "kilometers_max",
        )?;

        let date_from = filters
            .date_from
            .as_deref()
            .map(|v| parse_date_bound(v, "date_from", DateBound::Start))
            .transpose()?;
        let date_to = filters
            .date_to
            .as_deref()
            .map(|v| parse_date_bound(v, "date_to", DateBound::End))
            .transpose()?;
        ensure_ordered(date_from.as_ref(), date_to.as_ref(), "date_from", "date_to")?;

        let mut predicate = Predicate::default();

        let substring_filters = [
            ("make", &filters.make),
            ("model", &filters.model),
            ("body_type", &filters.body_type),
            ("fuel_type", &filters.fuel_type),
            ("location", &filters.location),
            ("seller_type", &filters.seller_type),
        ];
        for (column, value) in substring_filters {
            if let Some(value) = trimmed(value) {
                predicate.push(Condition::Contains { column, value });
            }
        }

        if let Some(year) = trimmed(&filters.year) {
            predicate.push(Condition::Eq { column: "year", value: SqlValue::Text(year) });
        }
        if let Some(status) = trimmed(&filters.status) {
            predicate.push(Condition::Eq { column: "status", value: SqlValue::Text(status) });
        }
        if let Some(min) = filters.price_min {
            predicate.push(Condition::Gte { column: "price_raw", value: SqlValue::Real(min) });
        }
        if let Some(max) = filters.price_max {
            predicate.push(Condition::Lte { column: "price_raw", value: SqlValue::Real(max) });
        }
        if let Some(min) = filters.kilometers_min {
            predicate.push(Condition::Gte { column: "kilometers", value: SqlValue::Integer(min) });
        }
        if let Some(max) = filters.kilometers_max {
            predicate.push(Condition::Lte { column: "kilometers", value: SqlValue::Integer(max) });
        }
        if let Some(from) = date_from {
            predicate.push(Condition::Gte {
                column: "created_at",
                value: SqlValue::Text(format_timestamp(&from)),
            });
        }
        if let Some(to) = date_to {
            predicate.push(Condition::Lte {
                column: "created_at",
                value: SqlValue::Text(format_timestamp(&to)),
            });
        }

        Ok(predicate)
    }
}

/// Filters for user exports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ExportFilter for UserFilters {
    const KIND: ExportKind = ExportKind::Users;

    fn compact(self) -> Self {
        Self {
            role: blank_to_none(self.role),
            email: blank_to_none(self.email),
        }
    }

    fn to_predicate(&self) -> DomainResult<Predicate> {
        let filters = self.clone().compact();
        let mut predicate = Predicate::default();

        if let Some(role) = trimmed(&filters.role) {
            predicate.push(Condition::EqIgnoreCase { column: "role", value: role });
        }
        if let Some(email) = trimmed(&filters.email) {
            predicate.push(Condition::Contains { column: "email", value: email });
        }

        Ok(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::export::types::PreviewQuery;
    use crate::errors::{DomainError, ValidationError};
    use axum::extract::Query;
    use serde_json::json;

    fn sql(predicate: &Predicate) -> String {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM car_listings");
        predicate.push_where(&mut builder);
        builder.sql().to_string()
    }

    #[test]
    fn test_price_and_make_predicate() {
        let filters = CarFilters {
            make: Some("toyota".to_string()),
            price_min: Some(1_000_000.0),
            price_max: Some(2_000_000.0),
            ..Default::default()
        };
        let predicate = filters.to_predicate().unwrap();
        assert_eq!(predicate.conditions().len(), 3);
        assert_eq!(
            predicate.conditions()[0],
            Condition::Contains { column: "make", value: "toyota".to_string() }
        );
        assert_eq!(
            sql(&predicate),
            "SELECT COUNT(*) FROM car_listings WHERE LOWER(make) LIKE LOWER(?) ESCAPE '\\' AND price_raw >= ? AND price_raw <= ?"
        );
    }

    #[test]
    fn test_empty_filters_match_everything() {
        let predicate = CarFilters { make: Some("  ".to_string()), ..Default::default() }
            .to_predicate()
            .unwrap();
        assert!(predicate.is_empty());
        assert_eq!(sql(&predicate), "SELECT COUNT(*) FROM car_listings");
    }

    #[test]
    fn test_inverted_and_negative_ranges_rejected() {
        let inverted = CarFilters { kilometers_min: Some(500), kilometers_max: Some(100), ..Default::default() };
        assert!(matches!(
            inverted.to_predicate(),
            Err(DomainError::Validation(ValidationError::InvertedRange { .. }))
        ));

        let negative = CarFilters { price_min: Some(-1.0), ..Default::default() };
        assert!(negative.to_predicate().is_err());

        let dates = CarFilters {
            date_from: Some("2024-03-02".to_string()),
            date_to: Some("2024-03-01".to_string()),
            ..Default::default()
        };
        assert!(dates.to_predicate().is_err());
    }

    #[test]
    fn test_same_day_range_spans_whole_day() {
        let filters = CarFilters {
            date_from: Some("2024-03-01".to_string()),
            date_to: Some("2024-03-01".to_string()),
            ..Default::default()
        };
        let predicate = filters.to_predicate().unwrap();
        assert_eq!(
            predicate.conditions()[1],
            Condition::Lte {
                column: "created_at",
                value: SqlValue::Text("2024-03-01T23:59:59.999Z".to_string()),
            }
        );
    }

    #[test]
    fn test_malformed_date_names_field() {
        let filters = CarFilters { date_to: Some("01/03/2024".to_string()), ..Default::default() };
        match filters.to_predicate() {
            Err(DomainError::Validation(ValidationError::Format { field, .. })) => assert_eq!(field, "date_to"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_filter_key_rejected() {
        assert!(serde_json::from_value::<UserFilters>(json!({"role": "admin", "salary": 1})).is_err());
        let filters: UserFilters = serde_json::from_value(json!({"role": "Admin"})).unwrap();
        let predicate = filters.to_predicate().unwrap();
        assert_eq!(
            predicate.conditions()[0],
            Condition::EqIgnoreCase { column: "role", value: "Admin".to_string() }
        );
    }

    #[test]
    fn test_non_finite_price_bound_rejected() {
        for bad in [f64::NAN, f64::INFINITY] {
            let filters = CarFilters { price_min: Some(bad), ..Default::default() };
            match filters.to_predicate() {
                Err(DomainError::Validation(ValidationError::InvalidValue { field, .. })) => {
                    assert_eq!(field, "price_min")
                }
                other => panic!("expected invalid price_min, got {:?}", other),
            }
        }

        let uri: axum::http::Uri = "/api/export/preview?type=cars&price_max=NaN".parse().unwrap();
        let Query(query) = Query::<PreviewQuery>::try_from_uri(&uri).unwrap();
        match query.car_filters().to_predicate() {
            Err(DomainError::Validation(ValidationError::InvalidValue { field, .. })) => assert_eq!(field, "price_max"),
            other => panic!("expected invalid price_max, got {:?}", other),
        }
    }

    #[test]
    fn test_applied_lists_only_supplied_filters() {
        let filters = CarFilters {
            make: Some("BMW".to_string()),
            model: Some("".to_string()),
            price_max: Some(5000.0),
            ..Default::default()
        }
        .compact();
        assert_eq!(filters.applied(), json!({"make": "BMW", "price_max": 5000.0}));
    }
}
