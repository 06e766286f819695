pub mod repository;
pub mod service;
pub mod types;

pub use repository::{CarListingRepository, SqliteCarListingRepository};
pub use service::CarListingService;
pub use types::{CarListing, CarPhoto};
