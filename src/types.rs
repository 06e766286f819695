use serde::{Deserialize, Serialize};
use chrono::{DateTime, SecondsFormat, Utc};
use crate::errors::{DomainError, DomainResult};

// Re-export UserRole and Permission from the permission module
pub use crate::domains::permission::{UserRole, Permission};

/// Render a timestamp the way it is stored and exported: `YYYY-MM-DDTHH:MM:SS.sssZ`.
/// The fixed width keeps stored values lexicographically sortable.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC 3339 timestamp back into UTC
pub fn parse_timestamp(value: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::Internal(format!("Invalid date format: {}", value)))
}

/// Current time, truncated to what the database keeps
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Client details captured alongside audited actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationParams {
    pub limit: u32,
    pub offset: u32,
}

impl PaginationParams {
    /// Build from an explicit offset, or derive it from a 1-based page
    pub fn resolve(limit: u32, offset: Option<u32>, page: Option<u32>) -> Self {
        let offset = match (offset, page) {
            (Some(offset), _) => offset,
            (None, Some(page)) if page > 0 => (page - 1) * limit,
            _ => 0,
        };
        Self { limit, offset }
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// Pagination block returned with every paged listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub page: u32,
    pub total_pages: u32,
}

/// Paginated result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PaginatedResult<T> {
    pub fn new(data: Vec<T>, total: u64, params: PaginationParams) -> Self {
        Self::with_page(data, total, params, params.offset / params.limit.max(1) + 1)
    }

    /// Same as `new` but reports the page number the caller asked for
    pub fn with_page(data: Vec<T>, total: u64, params: PaginationParams, page: u32) -> Self {
        let limit = params.limit.max(1);
        let total_pages = (total as f64 / limit as f64).ceil() as u32;
        Self {
            data,
            pagination: Pagination {
                total,
                limit: params.limit,
                offset: params.offset,
                page,
                total_pages,
            },
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
