use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::auth::LoginResult;
use crate::domains::user::types::{Credentials, NewUser, UserResponse};
use crate::types::now_timestamp;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let created = state.auth.register(user).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult<Json<LoginResult>> {
    Ok(Json(state.auth.login(credentials).await?))
}

pub async fn verify(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let auth = state
        .auth
        .verify_token(request.token.trim())
        .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

    Ok(Json(json!({
        "message": "Token is valid",
        "status": "authenticated",
        "user": { "id": auth.user_id, "email": auth.email },
        "timestamp": now_timestamp(),
    })))
}
