use crate::config::AppConfig;
use crate::errors::{DbError, ServiceError, ServiceResult};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::net::SocketAddr;

// Public modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db_migration;
pub mod domains;
pub mod errors;
pub mod types;
pub mod validation;

/// Open the SQLite pool described by `config`
pub async fn connect_pool(config: &AppConfig) -> ServiceResult<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| ServiceError::from(DbError::from(e)))
}

/// Initialize JWT settings, migrate the database and serve the API until ctrl-c
pub async fn run_server(config: AppConfig) -> ServiceResult<()> {
    auth::jwt::initialize(&config.jwt_secret, config.jwt_expiry_minutes);

    let pool = connect_pool(&config).await?;
    db_migration::run_migrations(&pool).await?;

    let state = api::AppState::new(pool, config.export_max_records);
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| ServiceError::Configuration(format!("Cannot bind {}: {}", config.bind_address, e)))?;
    log::info!("Listening on {}", config.bind_address);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::Configuration(format!("Server error: {}", e)))?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutdown signal received");
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::jwt;
    use crate::db_migration::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    pub const JWT_TEST_SECRET: &str = "test-secret-for-unit-tests";

    pub fn init_jwt() {
        jwt::initialize(JWT_TEST_SECRET, 60);
    }

    /// One connection, so every query sees the same in-memory database
    pub async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database")
    }

    pub async fn migrated_pool() -> SqlitePool {
        let pool = memory_pool().await;
        run_migrations(&pool).await.expect("migrations apply");
        pool
    }
}
