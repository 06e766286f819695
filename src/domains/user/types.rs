use crate::domains::history::diff::Auditable;
use crate::errors::{DomainError, DomainResult};
use crate::types::{format_timestamp, parse_timestamp, UserRole};
use crate::validation::{Validate, ValidationBuilder};
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use serde_json::{json, Value};
use sqlx::FromRow;

const ROLE_VALUES: &[&str] = &["admin", "manager", "user"];
const MIN_PASSWORD_LENGTH: usize = 6;

/// Core User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", or the email when both names are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

impl Auditable for User {
    fn audit_snapshot(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("email", json!(self.email)),
            ("password_hash", json!(self.password_hash)),
            ("firstName", json!(self.first_name)),
            ("lastName", json!(self.last_name)),
            ("phone", json!(self.phone)),
            ("role", json!(self.role.as_str())),
            ("bio", json!(self.bio)),
            ("isActive", json!(self.is_active)),
            ("created_at", json!(format_timestamp(&self.created_at))),
            ("updated_at", json!(format_timestamp(&self.updated_at))),
        ]
    }
}

/// NewUser DTO - used when creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    /// Plain text on the way in; replaced by the hash before it reaches the repository
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewUser {
    pub fn role(&self) -> UserRole {
        self.role
            .as_deref()
            .and_then(UserRole::from_str)
            .unwrap_or_default()
    }
}

impl Validate for NewUser {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("email", Some(self.email.clone()))
            .required()
            .email()
            .validate()?;

        ValidationBuilder::new("password", Some(self.password.clone()))
            .required()
            .min_length(MIN_PASSWORD_LENGTH)
            .validate()?;

        ValidationBuilder::new("firstName", Some(self.first_name.clone()))
            .required()
            .max_length(100)
            .validate()?;

        ValidationBuilder::new("lastName", Some(self.last_name.clone()))
            .required()
            .max_length(100)
            .validate()?;

        if let Some(role) = &self.role {
            ValidationBuilder::new("role", Some(role.to_ascii_lowercase()))
                .one_of(ROLE_VALUES, Some("Invalid role"))
                .validate()?;
        }

        Ok(())
    }
}

/// UpdateUser DTO - used when updating an existing user
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl Validate for UpdateUser {
    fn validate(&self) -> DomainResult<()> {
        if let Some(email) = &self.email {
            ValidationBuilder::new("email", Some(email.clone()))
                .email()
                .validate()?;
        }

        if let Some(password) = &self.password {
            ValidationBuilder::new("password", Some(password.clone()))
                .min_length(MIN_PASSWORD_LENGTH)
                .validate()?;
        }

        if let Some(first_name) = &self.first_name {
            ValidationBuilder::new("firstName", Some(first_name.clone()))
                .required()
                .max_length(100)
                .validate()?;
        }

        if let Some(last_name) = &self.last_name {
            ValidationBuilder::new("lastName", Some(last_name.clone()))
                .required()
                .max_length(100)
                .validate()?;
        }

        if let Some(role) = &self.role {
            ValidationBuilder::new("role", Some(role.to_ascii_lowercase()))
                .one_of(ROLE_VALUES, Some("Invalid role"))
                .validate()?;
        }

        Ok(())
    }
}

impl UpdateUser {
    /// Check whether the update payload carries any field changes.
    pub fn is_empty_update(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone.is_none()
            && self.bio.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

/// Credentials DTO - used for login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for Credentials {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("email", Some(self.email.clone()))
            .required()
            .email()
            .validate()?;

        ValidationBuilder::new("password", Some(self.password.clone()))
            .required()
            .validate()?;

        Ok(())
    }
}

/// UserRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub bio: Option<String>,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<User> {
        Ok(User {
            id: self.id,
            role: UserRole::from_str(&self.role)
                .ok_or_else(|| DomainError::Internal(format!("Invalid role: {}", self.role)))?,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            bio: self.bio,
            is_active: self.is_active != 0,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// UserResponse DTO - used for API responses (excludes sensitive fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: String,
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role.as_str().to_string(),
            bio: user.bio,
            is_active: user.is_active,
            created_at: format_timestamp(&user.created_at),
            updated_at: format_timestamp(&user.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            email: "ivan@example.com".to_string(),
            password: "secret1".to_string(),
            first_name: "Ivan".to_string(),
            last_name: "Petrov".to_string(),
            phone: None,
            bio: None,
            role: None,
            is_active: None,
        }
    }

    #[test]
    fn test_new_user_validation() {
        assert!(new_user().validate().is_ok());

        let mut short = new_user();
        short.password = "12345".to_string();
        assert!(short.validate().is_err());

        let mut bad_role = new_user();
        bad_role.role = Some("owner".to_string());
        assert!(bad_role.validate().is_err());

        let mut bad_email = new_user();
        bad_email.email = "ivan@".to_string();
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_new_user_role_defaults_to_user() {
        assert_eq!(new_user().role(), UserRole::User);
        let mut manager = new_user();
        manager.role = Some("Manager".to_string());
        assert_eq!(manager.role(), UserRole::Manager);
    }

    #[test]
    fn test_camel_case_payload() {
        let parsed: NewUser = serde_json::from_str(
            r#"{"email":"a@b.co","password":"secret1","firstName":"A","lastName":"B"}"#,
        )
        .unwrap();
        assert_eq!(parsed.first_name, "A");
        assert!(UpdateUser::default().is_empty_update());
    }
}
