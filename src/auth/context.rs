use crate::types::{UserRole, Permission};
use crate::errors::ServiceError;
use super::jwt::Claims;

/// Represents the authenticated principal for the current request
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The ID of the authenticated user
    pub user_id: i64,

    pub email: String,

    /// Name recorded in history entries
    pub display_name: String,

    /// The role of the authenticated user
    pub role: UserRole,
}

impl AuthContext {
    /// Create a new authentication context
    pub fn new(user_id: i64, email: String, display_name: String, role: UserRole) -> Self {
        Self {
            user_id,
            email,
            display_name,
            role,
        }
    }

    /// Build the principal from verified token claims
    pub fn from_claims(claims: Claims) -> Result<Self, ServiceError> {
        let role = UserRole::from_str(&claims.role)
            .ok_or_else(|| ServiceError::Authentication("Invalid role in token".to_string()))?;
        let display_name = if claims.name.trim().is_empty() {
            claims.email.clone()
        } else {
            claims.name
        };
        Ok(Self::new(claims.sub, claims.email, display_name, role))
    }

    /// Check if user has a specific permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    /// Authorize a specific permission, returning an error if not allowed
    pub fn authorize(&self, permission: Permission) -> Result<(), ServiceError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(format!(
                "User does not have permission: {:?}",
                permission
            )))
        }
    }

    /// Verify user is an admin
    pub fn authorize_admin(&self) -> Result<(), ServiceError> {
        if matches!(self.role, UserRole::Admin) {
            Ok(())
        } else {
            Err(ServiceError::PermissionDenied(
                "This action requires administrator privileges".to_string()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str, name: &str) -> Claims {
        Claims {
            sub: 3,
            email: "kim@example.com".to_string(),
            name: name.to_string(),
            role: role.to_string(),
            iat: 0,
            exp: 0,
            jti: "jti".to_string(),
        }
    }

    #[test]
    fn test_from_claims_falls_back_to_email() {
        let ctx = AuthContext::from_claims(claims("user", " ")).unwrap();
        assert_eq!(ctx.display_name, "kim@example.com");
        assert_eq!(ctx.role, UserRole::User);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(matches!(
            AuthContext::from_claims(claims("owner", "Kim")),
            Err(ServiceError::Authentication(_))
        ));
    }

    #[test]
    fn test_authorize() {
        let manager = AuthContext::from_claims(claims("manager", "Kim")).unwrap();
        assert!(manager.authorize(Permission::ExportData).is_ok());
        assert!(matches!(
            manager.authorize(Permission::ManageUsers),
            Err(ServiceError::PermissionDenied(_))
        ));
        assert!(manager.authorize_admin().is_err());
    }
}
