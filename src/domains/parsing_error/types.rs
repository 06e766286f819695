use crate::errors::{DomainError, DomainResult};
use crate::types::{format_timestamp, parse_timestamp};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sqlx::FromRow;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 500;
const MAX_PARSER_NAME_LENGTH: usize = 100;

/// What went wrong while scraping a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Parsing,
    Network,
    Browser,
    Database,
    Unknown,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Parsing => "parsing",
            ErrorType::Network => "network",
            ErrorType::Browser => "browser",
            ErrorType::Database => "database",
            ErrorType::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "parsing" => Some(ErrorType::Parsing),
            "network" => Some(ErrorType::Network),
            "browser" => Some(ErrorType::Browser),
            "database" => Some(ErrorType::Database),
            "unknown" => Some(ErrorType::Unknown),
            _ => None,
        }
    }
}

fn serialize_timestamp<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(dt))
}

fn serialize_optional_timestamp<S: Serializer>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
    match dt {
        Some(dt) => s.serialize_str(&format_timestamp(dt)),
        None => s.serialize_none(),
    }
}

/// A scraper failure, optionally with whatever listing data was extracted before it
#[derive(Debug, Clone, Serialize)]
pub struct ParsingError {
    pub id: i64,
    pub parser_name: String,
    pub url: String,
    pub error_type: ErrorType,
    pub error_name: Option<String>,
    pub error_message: Option<String>,
    pub error_stack: Option<String>,
    pub car_data: Option<Value>,
    pub context: Option<Value>,
    pub is_processed: bool,
    #[serde(serialize_with = "serialize_optional_timestamp")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Failure report written by a parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewParsingError {
    pub parser_name: String,
    pub url: String,
    pub error_type: ErrorType,
    #[serde(default)]
    pub error_name: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_stack: Option<String>,
    #[serde(default)]
    pub car_data: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl Validate for NewParsingError {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("parser_name", Some(self.parser_name.trim().to_string()))
            .required()
            .max_length(MAX_PARSER_NAME_LENGTH)
            .validate()?;
        ValidationBuilder::new("url", Some(self.url.trim().to_string()))
            .required()
            .validate()
    }
}

/// ParsingErrorRow - SQLite row representation
#[derive(Debug, Clone, FromRow)]
pub struct ParsingErrorRow {
    pub id: i64,
    pub parser_name: String,
    pub url: String,
    pub error_type: String,
    pub error_name: Option<String>,
    pub error_message: Option<String>,
    pub error_stack: Option<String>,
    pub car_data: Option<String>,
    pub context: Option<String>,
    pub is_processed: i64,
    pub processed_at: Option<String>,
    pub created_at: String,
}

fn parse_json(id: i64, column: &str, raw: Option<String>) -> DomainResult<Option<Value>> {
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| {
            DomainError::Internal(format!("Invalid {} for parsing error {}: {}", column, id, e))
        }),
    }
}

impl ParsingErrorRow {
    pub fn into_entity(self) -> DomainResult<ParsingError> {
        let id = self.id;
        Ok(ParsingError {
            id,
            parser_name: self.parser_name,
            url: self.url,
            error_type: ErrorType::from_str(&self.error_type).ok_or_else(|| {
                DomainError::Internal(format!("Invalid error type: {}", self.error_type))
            })?,
            error_name: self.error_name,
            error_message: self.error_message,
            error_stack: self.error_stack,
            car_data: parse_json(id, "car_data", self.car_data)?,
            context: parse_json(id, "context", self.context)?,
            is_processed: self.is_processed != 0,
            processed_at: self.processed_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Query parameters for listing parsing errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingErrorFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub parser_name: Option<String>,
    pub error_type: Option<ErrorType>,
    pub is_processed: Option<bool>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Ids to mark processed: a JSON array or a comma-separated string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdList(pub Vec<i64>);

impl IdList {
    /// Unparseable entries are skipped
    pub fn parse(raw: &str) -> Self {
        IdList(raw.split(',').filter_map(|id| id.trim().parse().ok()).collect())
    }
}

impl<'de> Deserialize<'de> for IdList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<i64>),
            Joined(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(ids) => IdList(ids),
            Raw::Joined(raw) => IdList::parse(&raw),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessManyRequest {
    #[serde(default)]
    pub ids: IdList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessManyQuery {
    pub ids: Option<String>,
}

/// Outcome of a bulk mark-processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkProcessResult {
    pub processed: usize,
    pub failed: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ParserErrorTypeStats {
    pub parser_name: String,
    pub error_type: String,
    pub total_errors: i64,
    pub unprocessed_errors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ErrorTypeStats {
    pub error_type: String,
    pub count: i64,
    pub unprocessed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ParserStats {
    pub parser_name: String,
    pub count: i64,
    pub unprocessed: i64,
}

/// Error counts by parser and type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsingErrorStats {
    pub stats: Vec<ParserErrorTypeStats>,
    #[serde(rename = "errorTypeStats")]
    pub error_type_stats: Vec<ErrorTypeStats>,
    #[serde(rename = "parserStats")]
    pub parser_stats: Vec<ParserStats>,
    pub total_unprocessed: i64,
}
