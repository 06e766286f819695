use crate::domains::history::diff::ChangeSet;
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::types::{format_timestamp, parse_timestamp};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 500;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Kind of entity a history entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Car,
    User,
    Favorite,
    Export,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Car => "car",
            EntityType::User => "user",
            EntityType::Favorite => "favorite",
            EntityType::Export => "export",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "car" => Some(EntityType::Car),
            "user" => Some(EntityType::User),
            "favorite" => Some(EntityType::Favorite),
            "export" => Some(EntityType::Export),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
    Export,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Create => "create",
            HistoryAction::Update => "update",
            HistoryAction::Delete => "delete",
            HistoryAction::Export => "export",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(HistoryAction::Create),
            "update" => Some(HistoryAction::Update),
            "delete" => Some(HistoryAction::Delete),
            "export" => Some(HistoryAction::Export),
            _ => None,
        }
    }
}

/// A recorded action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub action: HistoryAction,
    pub changes: Option<ChangeSet>,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

fn serialize_timestamp<S: serde::Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(dt))
}

/// Payload for appending a history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub action: HistoryAction,
    #[serde(default)]
    pub changes: Option<ChangeSet>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for NewHistoryEntry {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("entity_id", Some(self.entity_id))
            .min(1)
            .validate()?;

        if let Some(description) = &self.description {
            ValidationBuilder::new("description", Some(description.clone()))
                .max_length(MAX_DESCRIPTION_LENGTH)
                .validate()?;
        }

        Ok(())
    }
}

/// A fully attributed entry ready to be stored
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub action: HistoryAction,
    pub changes: Option<ChangeSet>,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// HistoryRow - SQLite row representation
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    pub changes: Option<String>,
    pub user_id: i64,
    pub user_name: Option<String>,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl HistoryRow {
    pub fn into_entity(self) -> DomainResult<HistoryEntry> {
        let changes = match self.changes.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(serde_json::from_str::<ChangeSet>(raw).map_err(|e| {
                DomainError::Internal(format!("Invalid changes for history {}: {}", self.id, e))
            })?),
        };

        Ok(HistoryEntry {
            id: self.id,
            entity_type: EntityType::from_str(&self.entity_type).ok_or_else(|| {
                DomainError::Internal(format!("Invalid entity type: {}", self.entity_type))
            })?,
            entity_id: self.entity_id,
            action: HistoryAction::from_str(&self.action)
                .ok_or_else(|| DomainError::Internal(format!("Invalid action: {}", self.action)))?,
            changes,
            user_id: self.user_id,
            user_name: self.user_name,
            description: self.description,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySortField {
    CreatedAt,
    UserId,
    EntityType,
    Action,
}

impl HistorySortField {
    pub const ALLOWED: &'static [&'static str] = &["created_at", "user_id", "entity_type", "action"];

    pub fn column(&self) -> &'static str {
        match self {
            HistorySortField::CreatedAt => "created_at",
            HistorySortField::UserId => "user_id",
            HistorySortField::EntityType => "entity_type",
            HistorySortField::Action => "action",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "created_at" => Ok(HistorySortField::CreatedAt),
            "user_id" => Ok(HistorySortField::UserId),
            "entity_type" => Ok(HistorySortField::EntityType),
            "action" => Ok(HistorySortField::Action),
            other => Err(DomainError::Validation(ValidationError::invalid_value(
                "sort_by",
                &format!("unsupported sort field '{}', expected one of: {}", other, Self::ALLOWED.join(", ")),
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(DomainError::Validation(ValidationError::invalid_value(
                "sort_order",
                "must be 'asc' or 'desc'",
            ))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query parameters for listing history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<i64>,
    pub action: Option<HistoryAction>,
    pub user_id: Option<i64>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub page: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Query parameters for one entity's history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityHistoryQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub action: Option<HistoryAction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStatsFilter {
    pub entity_type: Option<EntityType>,
    pub user_id: Option<i64>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserActivity {
    pub user_id: i64,
    pub user_name: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DateCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsPeriod {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Aggregates over the filtered history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_actions: i64,
    pub by_action: BTreeMap<String, i64>,
    pub by_entity_type: BTreeMap<String, i64>,
    pub by_user: Vec<UserActivity>,
    pub by_date: Vec<DateCount>,
    pub period: StatsPeriod,
}
