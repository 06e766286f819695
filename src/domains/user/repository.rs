use crate::errors::{DbError, DomainError, DomainResult};
use crate::domains::user::types::{User, NewUser, UpdateUser, UserRow};
use crate::types::{now_timestamp, UserRole};
use sqlx::{SqlitePool, query, query_as};
use async_trait::async_trait;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> DomainResult<User>;

    /// Find a user by email (exact, case-insensitive)
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    async fn find_all(&self) -> DomainResult<Vec<User>>;

    /// Insert a user; `user.password` must already be hashed
    async fn create(&self, user: NewUser) -> DomainResult<User>;

    /// Apply an update; `update.password`, when set, must already be hashed
    async fn update(&self, id: i64, update: UpdateUser) -> DomainResult<User>;

    async fn delete(&self, id: i64) -> DomainResult<()>;
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<User> {
        let row = query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("User".to_string(), id))?;

        row.into_entity()
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let row = query_as::<_, UserRow>("SELECT * FROM users WHERE LOWER(email) = LOWER(?)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        row.map(UserRow::into_entity).transpose()
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let rows = query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter().map(UserRow::into_entity).collect()
    }

    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let now = now_timestamp();
        let role: UserRole = user.role();

        let result = query(
            "INSERT INTO users (email, password_hash, first_name, last_name, phone, role, bio, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(user.email.trim())
        .bind(&user.password)
        .bind(user.first_name.trim())
        .bind(user.last_name.trim())
        .bind(&user.phone)
        .bind(role.as_str())
        .bind(&user.bio)
        .bind(user.is_active.unwrap_or(true) as i64)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from_write(e, "User with this email")))?;

        self.find_by_id(result.last_insert_rowid()).await
    }

    async fn update(&self, id: i64, update: UpdateUser) -> DomainResult<User> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let current = query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| DomainError::EntityNotFound("User".to_string(), id))?
            .into_entity()?;

        let role = update
            .role
            .as_deref()
            .and_then(UserRole::from_str)
            .unwrap_or(current.role);

        query(
            "UPDATE users SET email = ?, password_hash = ?, first_name = ?, last_name = ?, phone = ?,
                role = ?, bio = ?, is_active = ?, updated_at = ?
             WHERE id = ?"
        )
        .bind(update.email.as_deref().map(str::trim).unwrap_or(current.email.as_str()))
        .bind(update.password.as_deref().unwrap_or(current.password_hash.as_str()))
        .bind(update.first_name.as_deref().map(str::trim).unwrap_or(current.first_name.as_str()))
        .bind(update.last_name.as_deref().map(str::trim).unwrap_or(current.last_name.as_str()))
        .bind(update.phone.as_ref().or(current.phone.as_ref()))
        .bind(role.as_str())
        .bind(update.bio.as_ref().or(current.bio.as_ref()))
        .bind(update.is_active.unwrap_or(current.is_active) as i64)
        .bind(now_timestamp())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Database(DbError::from_write(e, "User with this email")))?;

        tx.commit().await.map_err(DbError::from)?;

        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let result = query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EntityNotFound("User".to_string(), id));
        }
        Ok(())
    }
}
