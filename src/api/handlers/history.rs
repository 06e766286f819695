use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::state::AppState;
use crate::auth::AuthContext;
use crate::domains::history::types::{
    EntityHistoryQuery, EntityType, HistoryEntry, HistoryFilter, HistoryStats, HistoryStatsFilter,
    NewHistoryEntry,
};
use crate::types::{PaginatedResult, RequestMeta};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

pub async fn create_entry(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiJson(entry): ApiJson<NewHistoryEntry>,
) -> ApiResult<(StatusCode, Json<HistoryEntry>)> {
    let created = state.history.create(entry, &auth, &meta).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_entries(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(filter): ApiQuery<HistoryFilter>,
) -> ApiResult<Json<PaginatedResult<HistoryEntry>>> {
    Ok(Json(state.history.list(filter, &auth).await?))
}

pub async fn stats(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(filter): ApiQuery<HistoryStatsFilter>,
) -> ApiResult<Json<HistoryStats>> {
    Ok(Json(state.history.stats(filter, &auth).await?))
}

pub async fn entity_history(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath((entity_type, entity_id)): ApiPath<(String, i64)>,
    ApiQuery(query): ApiQuery<EntityHistoryQuery>,
) -> ApiResult<Json<PaginatedResult<HistoryEntry>>> {
    let entity_type = EntityType::from_str(&entity_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown entity type: {}", entity_type)))?;
    Ok(Json(
        state
            .history
            .list_for_entity(entity_type, entity_id, query, &auth)
            .await?,
    ))
}

pub async fn get_entry(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<HistoryEntry>> {
    Ok(Json(state.history.get(id, &auth).await?))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    state.history.delete(id, &auth).await?;
    Ok(Json(json!({ "message": "Запись истории успешно удалена", "id": id })))
}
