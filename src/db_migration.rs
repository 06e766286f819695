use crate::errors::{DbError, DbResult};
use sqlx::SqlitePool;

// Embed all migration SQL files at compile time
const MIGRATION_INITIAL: &str = include_str!("../migrations/20250301000000_initial.sql");
const MIGRATION_PARSING_ERRORS: &str = include_str!("../migrations/20250315000000_parsing_errors.sql");

// List of migrations with their names and SQL content
const MIGRATIONS: &[(&str, &str)] = &[
    ("20250301000000_initial.sql", MIGRATION_INITIAL),
    ("20250315000000_parsing_errors.sql", MIGRATION_PARSING_ERRORS),
];

/// Apply every migration that has not been recorded yet
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    create_migrations_table(pool).await?;

    let last_migration = get_last_migration(pool).await?;
    match &last_migration {
        Some(name) => log::debug!("Last applied migration: {}", name),
        None => log::info!("No migrations applied yet"),
    }

    apply_pending_migrations(pool, last_migration).await
}

/// Create migrations table if it doesn't exist
async fn create_migrations_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await
    .map_err(|e| DbError::Migration(format!("Failed to create migrations table: {}", e)))?;

    Ok(())
}

/// Get the last applied migration
async fn get_last_migration(pool: &SqlitePool) -> DbResult<Option<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM migrations ORDER BY id DESC LIMIT 1"
    )
    .fetch_optional(pool)
    .await
    .map_err(|e| DbError::Migration(format!("Failed to get last migration: {}", e)))
}

/// Apply pending migrations inside a single transaction
async fn apply_pending_migrations(pool: &SqlitePool, last_migration: Option<String>) -> DbResult<()> {
    let pending_migrations = get_pending_migrations(last_migration.as_deref());

    if pending_migrations.is_empty() {
        log::debug!("No pending migrations to apply");
        return Ok(());
    }

    let mut tx = pool.begin().await
        .map_err(|e| DbError::Transaction(format!("Failed to begin transaction: {}", e)))?;

    for (migration_name, migration_sql) in pending_migrations {
        log::info!("Applying migration: {}", migration_name);

        sqlx::query(migration_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::Migration(format!("Failed to apply migration {}: {}", migration_name, e)))?;

        sqlx::query(
            "INSERT INTO migrations (name, applied_at) VALUES (?, ?)"
        )
        .bind(migration_name)
        .bind(crate::types::now_timestamp())
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::Migration(format!("Failed to record migration {}: {}", migration_name, e)))?;
    }

    tx.commit().await
        .map_err(|e| DbError::Transaction(format!("Failed to commit migrations: {}", e)))?;

    Ok(())
}

/// Determine which migrations need to be applied
fn get_pending_migrations(last_migration: Option<&str>) -> Vec<(&'static str, &'static str)> {
    match last_migration {
        None => MIGRATIONS.to_vec(),
        Some(last) => MIGRATIONS
            .iter()
            .skip_while(|(name, _)| *name != last)
            .skip(1)
            .copied()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_after_last_applied() {
        assert_eq!(get_pending_migrations(None).len(), MIGRATIONS.len());
        let after_initial = get_pending_migrations(Some("20250301000000_initial.sql"));
        assert_eq!(after_initial.len(), 1);
        assert_eq!(after_initial[0].0, "20250315000000_parsing_errors.sql");
        assert!(get_pending_migrations(Some("20250315000000_parsing_errors.sql")).is_empty());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = crate::test_support::memory_pool().await;
        run_migrations(&pool).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }
}
