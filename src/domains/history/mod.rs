pub mod diff;
pub mod repository;
pub mod service;
pub mod types;

pub use diff::{diff, Auditable, ChangeSet, FieldChange};
pub use repository::{HistoryRepository, SqliteHistoryRepository};
pub use service::HistoryService;
pub use types::{EntityType, HistoryAction, HistoryEntry, NewHistoryEntry};
