use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::state::AppState;
use crate::auth::AuthContext;
use crate::domains::car_listing::types::{
    CarListingQuery, CarListingResponse, NewCarListing, UpdateCarListing,
};
use crate::types::{PaginatedResult, RequestMeta};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

pub async fn create_listing(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiJson(listing): ApiJson<NewCarListing>,
) -> ApiResult<(StatusCode, Json<CarListingResponse>)> {
    let created = state.car_listings.create(listing, &auth, &meta).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Public listing, no token required
pub async fn list_listings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CarListingQuery>,
) -> ApiResult<Json<PaginatedResult<CarListingResponse>>> {
    Ok(Json(state.car_listings.list(query).await?))
}

pub async fn get_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<CarListingResponse>> {
    Ok(Json(state.car_listings.get(id).await?))
}

pub async fn update_listing(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<UpdateCarListing>,
) -> ApiResult<Json<CarListingResponse>> {
    Ok(Json(state.car_listings.update(id, update, &auth, &meta).await?))
}

pub async fn delete_listing(
    State(state): State<AppState>,
    auth: AuthContext,
    meta: RequestMeta,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.car_listings.delete(id, &auth, &meta).await?;
    Ok(StatusCode::NO_CONTENT)
}
