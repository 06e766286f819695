//! Bulk export of car listings and users.
//!
//! filter -> fields -> repository -> shaper -> writers, orchestrated by
//! [`ExportService`].

pub mod fields;
pub mod filter;
pub mod repository;
pub mod service;
pub mod shaper;
pub mod types;
pub mod writers;

pub use filter::{CarFilters, ExportFilter, UserFilters};
pub use repository::{ExportRepository, SqliteExportRepository};
pub use service::{ExportService, DEFAULT_MAX_RECORDS};
pub use types::{ExportFormat, ExportKind, ExportRequest, ExportResult, PreviewQuery, PreviewResponse};
