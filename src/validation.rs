use crate::errors::{ValidationError, DomainResult, DomainError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// A trait that entities should implement for validation.
pub trait Validate {
    /// Validates the entity and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

// Common regex patterns
fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap())
}

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self
    where T: Default + PartialEq {
        if self.value.is_none() || self.value == Some(T::default()) {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    pub fn validate_with<F>(mut self, validator: F) -> Self
    where F: FnOnce(&T) -> Result<(), ValidationError> {
        if let Some(value) = &self.value {
            if let Err(err) = validator(value) {
                self.errors.push(err);
            }
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(DomainError::Validation(first)),
        }
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    pub fn min_length(mut self, min: usize) -> Self {
        if let Some(value) = &self.value {
            if value.chars().count() < min {
                self.errors.push(ValidationError::min_length(&self.field_name, min));
            }
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let Some(value) = &self.value {
            if value.chars().count() > max {
                self.errors.push(ValidationError::max_length(&self.field_name, max));
            }
        }
        self
    }

    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors.push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    pub fn email(self) -> Self {
        self.matches_pattern(email_regex(), "must be a valid email address")
    }

    pub fn one_of(mut self, allowed_values: &[&str], message: Option<&str>) -> Self {
        if let Some(value) = &self.value {
            if !allowed_values.contains(&value.as_str()) {
                let reason = message.unwrap_or("must be one of the allowed values");
                self.errors.push(ValidationError::invalid_value(&self.field_name, reason));
            }
        }
        self
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where T: PartialOrd + Clone + std::fmt::Display
{
    pub fn min(mut self, min: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    "maximum".to_string()
                ));
            }
        }
        self
    }

    pub fn range(mut self, min: T, max: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min || value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    max.to_string()
                ));
            }
        }
        self
    }
}

impl ValidationBuilder<f64> {
    /// NaN and infinities compare false against every bound, so reject them up front
    pub fn finite(mut self) -> Self {
        if let Some(value) = self.value {
            if !value.is_finite() {
                self.errors.push(ValidationError::invalid_value(&self.field_name, "must be a finite number"));
            }
        }
        self
    }
}

/// Which end of a range a date value closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    Start,
    End,
}

/// Parse a user-supplied date for a range filter.
///
/// `YYYY-MM-DD` is widened to the first (`Start`) or last (`End`) millisecond of
/// that UTC day. RFC 3339 values are used as given; a date-time without offset
/// is read as UTC.
pub fn parse_date_bound(value: &str, field_name: &str, bound: DateBound) -> DomainResult<DateTime<Utc>> {
    let value = value.trim();
    let invalid = || DomainError::Validation(ValidationError::format(
        field_name,
        "must be an ISO 8601 date (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)",
    ));

    if value.len() == 10 {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
        let time = match bound {
            DateBound::Start => date.and_hms_milli_opt(0, 0, 0, 0),
            DateBound::End => date.and_hms_milli_opt(23, 59, 59, 999),
        };
        return time.map(|t| t.and_utc()).ok_or_else(invalid);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|dt| dt.and_utc())
        .map_err(|_| invalid())
}

/// Reject `lower > upper` for any pair of optional bounds
pub fn ensure_ordered<T: PartialOrd>(
    lower: Option<&T>,
    upper: Option<&T>,
    lower_name: &str,
    upper_name: &str,
) -> DomainResult<()> {
    match (lower, upper) {
        (Some(lo), Some(hi)) if lo > hi => Err(DomainError::Validation(
            ValidationError::inverted_range(lower_name, upper_name),
        )),
        _ => Ok(()),
    }
}

/// Escape LIKE wildcards so user input matches literally (paired with `ESCAPE '\'`)
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Treat blank optional strings as absent
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
