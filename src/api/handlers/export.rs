use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::auth::AuthContext;
use crate::domains::export::{
    CarFilters, ExportKind, ExportRequest, ExportResult, PreviewQuery, PreviewResponse, UserFilters,
};
use crate::types::RequestMeta;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

fn attachment(result: ExportResult) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", result.filename);
    (
        [
            (header::CONTENT_TYPE, result.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.bytes,
    )
        .into_response()
}

pub async fn export_cars(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiJson(request): ApiJson<ExportRequest<CarFilters>>,
) -> ApiResult<Response> {
    Ok(attachment(state.export.export(request, &auth, &meta).await?))
}

pub async fn export_users(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiJson(request): ApiJson<ExportRequest<UserFilters>>,
) -> ApiResult<Response> {
    Ok(attachment(state.export.export(request, &auth, &meta).await?))
}

pub async fn preview(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<PreviewQuery>,
) -> ApiResult<Json<PreviewResponse>> {
    let kind = query
        .kind
        .as_deref()
        .and_then(ExportKind::from_str)
        .ok_or_else(|| ApiError::BadRequest("Query parameter 'type' must be one of: cars, users".to_string()))?;

    let response = match kind {
        ExportKind::Cars => state.export.preview(query.car_filters(), &auth).await?,
        ExportKind::Users => state.export.preview(query.user_filters(), &auth).await?,
    };
    Ok(Json(response))
}
