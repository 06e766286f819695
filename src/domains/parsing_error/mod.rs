pub mod repository;
pub mod service;
pub mod types;

pub use repository::{ParsingErrorRepository, SqliteParsingErrorRepository};
pub use service::ParsingErrorService;
pub use types::{ErrorType, NewParsingError, ParsingError, ParsingErrorFilter};
