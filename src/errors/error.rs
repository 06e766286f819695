use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Record not found: {0} with ID {1}")]
    NotFound(String, String),

    #[error("Conflict error: {0}")]
    Conflict(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Database error: {0}")]
    Other(String),
}

impl DbError {
    /// Map a write failure, turning unique-constraint violations into `Conflict`
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        let is_unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if is_unique {
            DbError::Conflict(format!("{} already exists", what))
        } else {
            DbError::Sqlx(err)
        }
    }
}

impl serde::Serialize for DbError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let kind = match self {
            DbError::Sqlx(_) => "Sqlx",
            DbError::Transaction(_) => "Transaction",
            DbError::NotFound(_, _) => "NotFound",
            DbError::Conflict(_) => "Conflict",
            DbError::Migration(_) => "Migration",
            DbError::Other(_) => "Other",
        };
        let mut state = serializer.serialize_struct("DbError", 2)?;
        state.serialize_field("type", kind)?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Manual Clone implementation for DbError
impl Clone for DbError {
    fn clone(&self) -> Self {
        match self {
            DbError::Sqlx(err) => DbError::Other(format!("SQLx error: {}", err)),
            DbError::Transaction(s) => DbError::Transaction(s.clone()),
            DbError::NotFound(s1, s2) => DbError::NotFound(s1.clone(), s2.clone()),
            DbError::Conflict(s) => DbError::Conflict(s.clone()),
            DbError::Migration(s) => DbError::Migration(s.clone()),
            DbError::Other(s) => DbError::Other(s.clone()),
        }
    }
}

/// Domain-level errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum DomainError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Entity not found: {0} with ID {1}")]
    EntityNotFound(String, i64),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Service-level errors (application specific)
#[derive(Debug, Error, Clone, Serialize)]
pub enum ServiceError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Record limit exceeded: maximum {limit}, requested {actual}")]
    PayloadTooLarge {
        limit: usize,
        actual: usize,
    },

    #[error("Request exceeded the time limit")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Domain(DomainError::Validation(err))
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        ServiceError::Domain(DomainError::Database(err))
    }
}

/// Validation errors
#[derive(Debug, Error, Clone, Serialize)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required {
        field: String,
    },

    #[error("Field '{field}' must be at least {min} characters")]
    MinLength {
        field: String,
        min: usize,
    },

    #[error("Field '{field}' cannot exceed {max} characters")]
    MaxLength {
        field: String,
        max: usize,
    },

    #[error("Field '{field}' must be between {min} and {max}")]
    Range {
        field: String,
        min: String,
        max: String,
    },

    #[error("Field '{lower}' cannot be greater than '{upper}'")]
    InvertedRange {
        lower: String,
        upper: String,
    },

    #[error("Field '{field}' contains invalid format: {reason}")]
    Format {
        field: String,
        reason: String,
    },

    #[error("Field '{field}' contains an invalid value: {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },

    #[error("Invalid export fields for {entity}: {}", .invalid.join(", "))]
    InvalidFields {
        entity: String,
        invalid: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("Validation error: {0}")]
    Custom(String),
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self::Required {
            field: field.to_string(),
        }
    }

    pub fn min_length(field: &str, min: usize) -> Self {
        Self::MinLength {
            field: field.to_string(),
            min,
        }
    }

    pub fn max_length(field: &str, max: usize) -> Self {
        Self::MaxLength {
            field: field.to_string(),
            max,
        }
    }

    pub fn range<T: fmt::Display>(field: &str, min: T, max: T) -> Self {
        Self::Range {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn inverted_range(lower: &str, upper: &str) -> Self {
        Self::InvertedRange {
            lower: lower.to_string(),
            upper: upper.to_string(),
        }
    }

    pub fn format(field: &str, reason: &str) -> Self {
        Self::Format {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn custom(message: &str) -> Self {
        Self::Custom(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_pool;

    #[tokio::test]
    async fn test_unique_violation_surfaces_as_conflict() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE t (email TEXT UNIQUE)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO t VALUES ('a@example.com')").execute(&pool).await.unwrap();

        let err = sqlx::query("INSERT INTO t VALUES ('a@example.com')")
            .execute(&pool)
            .await
            .unwrap_err();
        let err = DbError::from_write(err, "User");
        assert!(matches!(&err, DbError::Conflict(msg) if msg == "User already exists"));

        let value = serde_json::to_value(err.clone()).unwrap();
        assert_eq!(value["type"], "Conflict");
    }
}
