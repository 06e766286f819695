//! HTTP surface: routes under `/api` plus an unauthenticated `/health`.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use handlers::{auth, car_listings, export, health, history, parsing_errors, statistics, users};

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", post(auth::verify))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        // Car listings
        .route(
            "/car-listings",
            get(car_listings::list_listings).post(car_listings::create_listing),
        )
        .route(
            "/car-listings/:id",
            get(car_listings::get_listing)
                .patch(car_listings::update_listing)
                .delete(car_listings::delete_listing),
        )
        // History
        .route("/history", get(history::list_entries).post(history::create_entry))
        .route("/history/stats", get(history::stats))
        .route("/history/entity/:entity_type/:entity_id", get(history::entity_history))
        .route("/history/:id", get(history::get_entry).delete(history::delete_entry))
        // Export
        .route("/export/cars", post(export::export_cars))
        .route("/export/users", post(export::export_users))
        .route("/export/preview", get(export::preview))
        // Statistics
        .route("/statistics", get(statistics::dashboard))
        .route("/statistics/overview", get(statistics::overview))
        .route("/statistics/monthly-cars", get(statistics::monthly_cars))
        .route("/statistics/status", get(statistics::status))
        .route("/statistics/period", get(statistics::period))
        .route("/statistics/target", get(statistics::target))
        // Parsing errors
        .route("/parsing-errors", get(parsing_errors::list_errors))
        .route("/parsing-errors/stats", get(parsing_errors::stats))
        .route("/parsing-errors/partial-data", get(parsing_errors::partial_data))
        .route("/parsing-errors/process-multiple", post(parsing_errors::process_many))
        .route("/parsing-errors/:id", get(parsing_errors::get_error))
        .route("/parsing-errors/:id/process", post(parsing_errors::process_error));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::access_log))
}
