pub mod car_listing;
pub mod export;
pub mod history;
pub mod parsing_error;
pub mod permission;
pub mod statistics;
pub mod user;

pub use user::{User, UserService};
