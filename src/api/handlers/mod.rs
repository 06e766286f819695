pub mod auth;
pub mod car_listings;
pub mod export;
pub mod health;
pub mod history;
pub mod parsing_errors;
pub mod statistics;
pub mod users;
