use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::state::AppState;
use crate::auth::AuthContext;
use crate::domains::user::types::{NewUser, UpdateUser, UserResponse};
use crate::types::RequestMeta;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiJson(user): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let created = state.users.create_user(user, &auth, &meta).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_users(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<Vec<UserResponse>>> {
    Ok(Json(state.users.get_all_users(&auth).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserResponse>> {
    Ok(Json(state.users.get_user(id, &auth).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UpdateUser>,
) -> ApiResult<Json<UserResponse>> {
    let updated = state.users.update_user(id, update, &auth, &meta).await?;
    Ok(Json(updated.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.users.delete_user(id, &auth, &meta).await?;
    Ok(StatusCode::NO_CONTENT)
}
