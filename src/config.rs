use crate::errors::{ServiceError, ServiceResult};
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://auto_backend.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_JWT_EXPIRY_MINUTES: i64 = 24 * 60;
pub const DEFAULT_EXPORT_MAX_RECORDS: usize = 100_000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    pub export_max_records: usize,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ServiceError::Configuration("JWT_SECRET must be set".to_string()))?;

        let config = Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            jwt_secret,
            jwt_expiry_minutes: parse_or(&lookup, "JWT_EXPIRY_MINUTES", DEFAULT_JWT_EXPIRY_MINUTES)?,
            export_max_records: parse_or(&lookup, "EXPORT_MAX_RECORDS", DEFAULT_EXPORT_MAX_RECORDS)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
        };

        if config.jwt_expiry_minutes <= 0 {
            return Err(ServiceError::Configuration(
                "JWT_EXPIRY_MINUTES must be positive".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> ServiceResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ServiceError::Configuration(format!("{} has an invalid value: {}", key, raw))
        }),
    }
}
