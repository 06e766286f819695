use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::state::AppState;
use crate::auth::AuthContext;
use crate::domains::parsing_error::types::{
    IdList, ParsingError, ParsingErrorFilter, ParsingErrorStats, ProcessManyQuery, ProcessManyRequest,
};
use crate::types::PaginatedResult;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn list_errors(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(filter): ApiQuery<ParsingErrorFilter>,
) -> ApiResult<Json<PaginatedResult<ParsingError>>> {
    Ok(Json(state.parsing_errors.list(filter, &auth).await?))
}

pub async fn partial_data(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(filter): ApiQuery<ParsingErrorFilter>,
) -> ApiResult<Json<PaginatedResult<ParsingError>>> {
    Ok(Json(state.parsing_errors.partial_data(filter, &auth).await?))
}

pub async fn stats(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<ParsingErrorStats>> {
    Ok(Json(state.parsing_errors.stats(&auth).await?))
}

pub async fn get_error(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<ParsingError>> {
    Ok(Json(state.parsing_errors.get(id, &auth).await?))
}

pub async fn process_error(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Value>> {
    let error = state.parsing_errors.mark_processed(id, &auth).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Ошибка отмечена как обработанная",
        "error_id": id,
        "error": error,
    })))
}

/// Ids come from the JSON body, falling back to `?ids=1,2,3`
pub async fn process_many(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ProcessManyQuery>,
    body: Option<ApiJson<ProcessManyRequest>>,
) -> ApiResult<Json<Value>> {
    let mut ids = body.map(|ApiJson(request)| request.ids).unwrap_or_default();
    if ids.0.is_empty() {
        if let Some(raw) = &query.ids {
            ids = IdList::parse(raw);
        }
    }

    let result = state.parsing_errors.mark_many_processed(&ids.0, &auth).await?;
    if ids.0.is_empty() {
        return Ok(Json(json!({
            "success": false,
            "message": "Не указаны ID ошибок",
            "processed_count": 0,
            "failed_ids": [],
        })));
    }
    Ok(Json(json!({
        "success": true,
        "message": format!("Обработано {} из {} ошибок", result.processed, ids.0.len()),
        "processed_count": result.processed,
        "failed_ids": result.failed,
    })))
}
