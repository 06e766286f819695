use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use crate::errors::{ServiceError, ServiceResult, DomainError};
use crate::types::UserRole;
use std::sync::OnceLock;

/// Claims carried by an access token. Role and display name travel with the
/// token so requests can be authorized without reloading the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

struct JwtSettings {
    secret: String,
    expiry_minutes: i64,
}

static JWT_SETTINGS: OnceLock<JwtSettings> = OnceLock::new();

/// Initialize JWT module with secret and access token lifetime
pub fn initialize(secret: &str, expiry_minutes: i64) {
    JWT_SETTINGS.get_or_init(|| JwtSettings {
        secret: secret.to_string(),
        expiry_minutes,
    });
}

fn get_settings() -> ServiceResult<&'static JwtSettings> {
    JWT_SETTINGS.get()
        .ok_or_else(|| ServiceError::Configuration("JWT secret not initialized".to_string()))
}

/// Generate an access token
pub fn generate_token(
    user_id: i64,
    email: &str,
    name: &str,
    role: &UserRole,
) -> ServiceResult<(String, DateTime<Utc>)> {
    let settings = get_settings()?;

    let now = Utc::now();
    let expiry = now + chrono::Duration::minutes(settings.expiry_minutes);

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        name: name.to_string(),
        role: role.as_str().to_string(),
        iat: now.timestamp(),
        exp: expiry.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode_claims(&claims, &settings.secret)?;
    Ok((token, expiry))
}

fn encode_claims(claims: &Claims, secret: &str) -> ServiceResult<String> {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::Domain(DomainError::Internal(format!("JWT encoding error: {}", e))))
}

/// Verify a JWT token
pub fn verify_token(token: &str) -> ServiceResult<Claims> {
    let settings = get_settings()?;

    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(settings.secret.as_bytes()),
        &jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::SessionExpired,
        _ => ServiceError::Authentication(format!("Invalid token: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_keeps_role_and_name() {
        crate::test_support::init_jwt();
        let (token, expiry) = generate_token(7, "ann@example.com", "Ann Lee", &UserRole::Manager).unwrap();
        assert!(expiry > Utc::now());

        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "manager");
        assert_eq!(claims.name, "Ann Lee");
    }

    #[test]
    fn test_tampered_token_rejected() {
        crate::test_support::init_jwt();
        let (token, _) = generate_token(1, "a@example.com", "A B", &UserRole::User).unwrap();
        let forged = format!("{}x", token);
        assert!(matches!(verify_token(&forged), Err(ServiceError::Authentication(_))));
    }

    #[test]
    fn test_expired_token_reports_session_expired() {
        crate::test_support::init_jwt();
        let past = Utc::now() - chrono::Duration::hours(2);
        let claims = Claims {
            sub: 1,
            email: "a@example.com".to_string(),
            name: "A B".to_string(),
            role: "admin".to_string(),
            iat: past.timestamp(),
            exp: past.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode_claims(&claims, crate::test_support::JWT_TEST_SECRET).unwrap();
        assert!(matches!(verify_token(&token), Err(ServiceError::SessionExpired)));
    }
}
