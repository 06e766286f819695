use crate::api::error::ApiResult;
use crate::api::extract::ApiQuery;
use crate::api::state::AppState;
use crate::auth::AuthContext;
use crate::domains::statistics::types::{
    DashboardStats, MonthlyCount, OverviewStats, PeriodBucket, StatisticsQuery, StatusCount, TargetStats,
};
use axum::extract::State;
use axum::Json;

pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.statistics.dashboard(query, &auth).await?))
}

pub async fn overview(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> ApiResult<Json<OverviewStats>> {
    Ok(Json(state.statistics.overview(query, &auth).await?))
}

pub async fn monthly_cars(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> ApiResult<Json<Vec<MonthlyCount>>> {
    Ok(Json(state.statistics.monthly_cars(query, &auth).await?))
}

pub async fn status(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> ApiResult<Json<Vec<StatusCount>>> {
    Ok(Json(state.statistics.status(query, &auth).await?))
}

pub async fn period(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> ApiResult<Json<Vec<PeriodBucket>>> {
    Ok(Json(state.statistics.period(query, &auth).await?))
}

pub async fn target(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<StatisticsQuery>,
) -> ApiResult<Json<TargetStats>> {
    Ok(Json(state.statistics.target(query, &auth).await?))
}
