use crate::errors::{DbError, DomainError, ServiceError, ValidationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// Error returned by every handler; rendered as `{"error": {"code", "message", "details"?}}`
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Malformed body, query string or path
    BadRequest(String),
    /// Missing or malformed bearer credentials
    Unauthorized(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Service(ServiceError::Domain(err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Service(err) => service_status(err),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Service(ServiceError::Domain(DomainError::Validation(err))) => err.to_string(),
            ApiError::Service(ServiceError::Domain(DomainError::Database(DbError::Conflict(msg)))) => msg.clone(),
            ApiError::Service(ServiceError::Domain(err @ DomainError::EntityNotFound(..))) => err.to_string(),
            ApiError::Service(ServiceError::Domain(DomainError::Database(err @ DbError::NotFound(..)))) => {
                err.to_string()
            }
            ApiError::Service(err) if self.status().is_server_error() && !matches!(err, ServiceError::Timeout) => {
                "Internal server error".to_string()
            }
            ApiError::Service(err) => err.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Service(ServiceError::Domain(DomainError::Validation(ValidationError::InvalidFields {
                entity,
                invalid,
                allowed,
            }))) => Some(json!({
                "invalid_fields": invalid,
                "allowed_fields": allowed,
                "type": entity,
            })),
            ApiError::Service(ServiceError::PayloadTooLarge { limit, actual }) => Some(json!({
                "limit": limit,
                "actual": actual,
            })),
            _ => None,
        }
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Authentication(_) | ServiceError::SessionExpired => StatusCode::UNAUTHORIZED,
        ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ServiceError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ServiceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Domain(err) => match err {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::EntityNotFound(..) | DomainError::Database(DbError::NotFound(..)) => StatusCode::NOT_FOUND,
            DomainError::Database(DbError::Conflict(_)) => StatusCode::CONFLICT,
            DomainError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {:?}", self);
        }

        let mut error = json!({
            "code": status.as_u16(),
            "message": self.message(),
        });
        if let Some(details) = self.details() {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::from(ValidationError::required("email")), StatusCode::BAD_REQUEST),
            (ServiceError::Authentication("bad".to_string()), StatusCode::UNAUTHORIZED),
            (ServiceError::PermissionDenied("no".to_string()), StatusCode::FORBIDDEN),
            (
                ServiceError::Domain(DomainError::EntityNotFound("User".to_string(), 4)),
                StatusCode::NOT_FOUND,
            ),
            (ServiceError::from(DbError::Conflict("email".to_string())), StatusCode::CONFLICT),
            (ServiceError::PayloadTooLarge { limit: 1, actual: 2 }, StatusCode::PAYLOAD_TOO_LARGE),
            (ServiceError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (ServiceError::from(DbError::Other("disk".to_string())), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_invalid_fields_details() {
        let err = ApiError::from(DomainError::Validation(ValidationError::InvalidFields {
            entity: "users".to_string(),
            invalid: vec!["salary".to_string()],
            allowed: vec!["id".to_string(), "email".to_string()],
        }));
        assert_eq!(
            err.details(),
            Some(json!({
                "invalid_fields": ["salary"],
                "allowed_fields": ["id", "email"],
                "type": "users",
            }))
        );
    }

    #[test]
    fn test_internal_messages_are_hidden() {
        let err = ApiError::from(ServiceError::from(DbError::Other("disk I/O error".to_string())));
        assert_eq!(err.message(), "Internal server error");
        assert_eq!(ApiError::from(ServiceError::Timeout).message(), "Request exceeded the time limit");
    }
}
