use crate::auth::{AuthContext, AuthService};
use crate::domains::history::types::{EntityType, HistoryAction, NewHistoryEntry};
use crate::domains::history::{diff, HistoryService};
use crate::domains::user::repository::UserRepository;
use crate::domains::user::types::{NewUser, UpdateUser, User, UserResponse};
use crate::errors::{DomainError, ServiceError, ServiceResult, ValidationError};
use crate::types::{Permission, RequestMeta};
use crate::validation::Validate;
use std::sync::Arc;

/// Service for user-related operations
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    auth_service: Arc<AuthService>,
    history: Arc<HistoryService>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        auth_service: Arc<AuthService>,
        history: Arc<HistoryService>,
    ) -> Self {
        Self { user_repo, auth_service, history }
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: i64, auth: &AuthContext) -> ServiceResult<UserResponse> {
        auth.authorize(Permission::ViewUsers)?;
        Ok(self.user_repo.find_by_id(id).await?.into())
    }

    pub async fn get_all_users(&self, auth: &AuthContext) -> ServiceResult<Vec<UserResponse>> {
        auth.authorize(Permission::ViewUsers)?;
        let users = self.user_repo.find_all().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// Create a new user
    pub async fn create_user(
        &self,
        mut user: NewUser,
        auth: &AuthContext,
        meta: &RequestMeta,
    ) -> ServiceResult<User> {
        auth.authorize(Permission::ManageUsers)?;
        user.validate()?;

        user.password = self.auth_service.hash_password(&user.password)?;
        let created = self.user_repo.create(user).await?;

        self.log_change(
            NewHistoryEntry {
                entity_type: EntityType::User,
                entity_id: created.id,
                action: HistoryAction::Create,
                changes: None,
                description: Some(format!("Создан пользователь: {}", created.email)),
            },
            auth,
            meta,
        )
        .await;

        Ok(created)
    }

    /// Update an existing user, recording the changed fields
    pub async fn update_user(
        &self,
        id: i64,
        mut update: UpdateUser,
        auth: &AuthContext,
        meta: &RequestMeta,
    ) -> ServiceResult<User> {
        auth.authorize(Permission::ManageUsers)?;
        update.validate()?;

        let before = self.user_repo.find_by_id(id).await?;
        if update.is_empty_update() {
            return Ok(before);
        }

        if let Some(password) = update.password.take() {
            update.password = Some(self.auth_service.hash_password(&password)?);
        }

        let updated = self.user_repo.update(id, update).await?;

        self.log_change(
            NewHistoryEntry {
                entity_type: EntityType::User,
                entity_id: updated.id,
                action: HistoryAction::Update,
                changes: diff(&before, &updated),
                description: Some(format!("Обновлен пользователь: {}", updated.email)),
            },
            auth,
            meta,
        )
        .await;

        Ok(updated)
    }

    /// Permanently delete a user
    pub async fn delete_user(&self, id: i64, auth: &AuthContext, meta: &RequestMeta) -> ServiceResult<()> {
        auth.authorize(Permission::ManageUsers)?;

        if id == auth.user_id {
            return Err(ServiceError::Domain(DomainError::Validation(
                ValidationError::custom("Cannot delete your own user account"),
            )));
        }

        let user = self.user_repo.find_by_id(id).await?;
        self.user_repo.delete(id).await?;

        self.log_change(
            NewHistoryEntry {
                entity_type: EntityType::User,
                entity_id: id,
                action: HistoryAction::Delete,
                changes: None,
                description: Some(format!("Удален пользователь: {}", user.email)),
            },
            auth,
            meta,
        )
        .await;

        Ok(())
    }

    async fn log_change(&self, entry: NewHistoryEntry, auth: &AuthContext, meta: &RequestMeta) {
        let entity_id = entry.entity_id;
        if let Err(e) = self.history.record(entry, auth, meta).await {
            log::error!("Failed to record history for user {}: {}", entity_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::history::types::HistoryFilter;
    use crate::domains::history::SqliteHistoryRepository;
    use crate::domains::user::repository::SqliteUserRepository;
    use crate::test_support::migrated_pool;
    use crate::types::UserRole;
    use serde_json::json;

    struct Fixture {
        users: UserService,
        history: Arc<HistoryService>,
    }

    async fn fixture() -> Fixture {
        let pool = migrated_pool().await;
        let user_repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(pool.clone()));
        let history = Arc::new(HistoryService::new(Arc::new(SqliteHistoryRepository::new(pool))));
        let auth_service = Arc::new(AuthService::new(user_repo.clone()));
        Fixture {
            users: UserService::new(user_repo, auth_service, history.clone()),
            history,
        }
    }

    fn admin() -> AuthContext {
        AuthContext::new(100, "root@example.com".to_string(), "Root".to_string(), UserRole::Admin)
    }

    fn new_user() -> NewUser {
        NewUser {
            email: "pavel@example.com".to_string(),
            password: "secret1".to_string(),
            first_name: "Pavel".to_string(),
            last_name: "Sokolov".to_string(),
            phone: None,
            bio: None,
            role: None,
            is_active: None,
        }
    }

    #[tokio::test]
    async fn test_update_records_only_changed_fields() {
        let fx = fixture().await;
        let auth = admin();
        let created = fx.users.create_user(new_user(), &auth, &RequestMeta::default()).await.unwrap();

        fx.users
            .update_user(
                created.id,
                UpdateUser {
                    role: Some("manager".to_string()),
                    password: Some("another1".to_string()),
                    ..Default::default()
                },
                &auth,
                &RequestMeta::default(),
            )
            .await
            .unwrap();

        let page = fx
            .history
            .list(
                HistoryFilter { action: Some(HistoryAction::Update), ..Default::default() },
                &auth,
            )
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);

        let changes = page.data[0].changes.clone().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["role"].old, json!("user"));
        assert_eq!(changes["role"].new, json!("manager"));
    }

    #[tokio::test]
    async fn test_manager_cannot_manage_users() {
        let fx = fixture().await;
        let manager = AuthContext::new(5, "m@example.com".to_string(), "M".to_string(), UserRole::Manager);
        assert!(matches!(
            fx.users.create_user(new_user(), &manager, &RequestMeta::default()).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(fx.users.get_all_users(&manager).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_logs_and_blocks_self() {
        let fx = fixture().await;
        let auth = admin();
        let created = fx.users.create_user(new_user(), &auth, &RequestMeta::default()).await.unwrap();

        let own = AuthContext::new(created.id, created.email.clone(), "Pavel".to_string(), UserRole::Admin);
        assert!(fx.users.delete_user(created.id, &own, &RequestMeta::default()).await.is_err());

        fx.users.delete_user(created.id, &auth, &RequestMeta::default()).await.unwrap();
        assert!(matches!(
            fx.users.get_user(created.id, &auth).await,
            Err(ServiceError::Domain(DomainError::EntityNotFound(_, _)))
        ));

        let page = fx
            .history
            .list(HistoryFilter { action: Some(HistoryAction::Delete), ..Default::default() }, &auth)
            .await
            .unwrap();
        assert_eq!(page.data[0].description.as_deref(), Some("Удален пользователь: pavel@example.com"));
    }
}
