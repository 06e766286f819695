use crate::auth::{jwt, AuthContext};
use crate::domains::user::repository::UserRepository;
use crate::domains::user::types::{Credentials, NewUser, User, UserResponse};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use crate::types::{format_timestamp, UserRole};
use crate::validation::Validate;
use argon2::{Argon2, PasswordHash, PasswordVerifier, PasswordHasher, password_hash::SaltString};
// Use the older rand version for compatibility with argon2
use rand_core::OsRng as ArgonOsRng;
use serde::Serialize;
use std::sync::Arc;

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: String,
    pub user: UserResponse,
}

/// Auth service for handling user authentication
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Authenticate a user with email and password, returning an access token
    pub async fn login(&self, credentials: Credentials) -> ServiceResult<LoginResult> {
        credentials.validate()?;

        let user = match self.user_repo.find_by_email(&credentials.email).await? {
            Some(user) => user,
            None => {
                log::warn!("Login attempt for unknown email {}", credentials.email);
                return Err(ServiceError::Authentication("Invalid credentials".to_string()));
            }
        };

        if !user.is_active {
            log::warn!("Login attempt for inactive user {}", user.id);
            return Err(ServiceError::Authentication("Account is inactive".to_string()));
        }

        if self.verify_password(&credentials.password, &user.password_hash).is_err() {
            log::warn!("Failed login for user {}", user.id);
            return Err(ServiceError::Authentication("Invalid credentials".to_string()));
        }

        let (access_token, expiry) =
            jwt::generate_token(user.id, &user.email, &user.display_name(), &user.role)?;

        log::info!("User {} logged in", user.id);

        Ok(LoginResult {
            access_token,
            token_type: "Bearer".to_string(),
            expires_at: format_timestamp(&expiry),
            user: user.into(),
        })
    }

    /// Self-service sign-up; the account always gets the `user` role
    pub async fn register(&self, mut user: NewUser) -> ServiceResult<User> {
        user.validate()?;
        user.role = Some(UserRole::User.as_str().to_string());
        user.password = self.hash_password(&user.password)?;

        let created = self.user_repo.create(user).await?;
        log::info!("Registered user {}", created.id);
        Ok(created)
    }

    /// Verify an access token and create an auth context
    pub fn verify_token(&self, token: &str) -> ServiceResult<AuthContext> {
        let claims = jwt::verify_token(token)?;
        AuthContext::from_claims(claims)
    }

    /// Generate a hash for a new password
    pub fn hash_password(&self, password: &str) -> ServiceResult<String> {
        let mut rng = ArgonOsRng;
        let salt = SaltString::generate(&mut rng);

        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ServiceError::Domain(DomainError::Internal(format!("Failed to hash password: {}", e))))?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<(), ServiceError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|_| ServiceError::Domain(DomainError::Internal("Invalid password hash format".to_string())))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| ServiceError::Authentication("Invalid password".to_string()))
    }
}
