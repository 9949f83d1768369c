use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::stations::{GroundStation, StationRequest};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::Caller;
use crate::web::config::Permission;
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/api/stations",
    tag = "stations",
    responses(
        (status = 200, description = "Built-in and custom ground stations", body = Vec<GroundStation>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn list_stations(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<GroundStation>>> {
    caller.require(Permission::ViewPredictions)?;
    Ok(Json(state.stations.read().await.all()))
}

#[utoipa::path(
    post,
    path = "/api/stations",
    tag = "stations",
    request_body = StationRequest,
    responses(
        (status = 201, description = "Station registered", body = GroundStation),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn register_station(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<StationRequest>,
) -> ApiResult<impl IntoResponse> {
    caller.require(Permission::ManageStations)?;

    let station = state.stations.write().await.register(request)?;
    Ok((StatusCode::CREATED, Json(station)))
}

#[utoipa::path(
    get,
    path = "/api/stations/{id}",
    tag = "stations",
    params(
        ("id" = String, Path, description = "Station ID")
    ),
    responses(
        (status = 200, description = "Ground station", body = GroundStation),
        (status = 404, description = "Station not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_station(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<GroundStation>> {
    caller.require(Permission::ViewPredictions)?;

    state
        .stations
        .read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("station_not_found"))
}

#[utoipa::path(
    delete,
    path = "/api/stations/{id}",
    tag = "stations",
    params(
        ("id" = String, Path, description = "Custom station ID")
    ),
    responses(
        (status = 204, description = "Station removed"),
        (status = 404, description = "Station not found", body = ErrorResponse),
        (status = 409, description = "Built-in stations cannot be removed", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn remove_station(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    caller.require(Permission::ManageStations)?;

    state.stations.write().await.remove(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/stations/{id}/toggle",
    tag = "stations",
    params(
        ("id" = String, Path, description = "Custom station ID")
    ),
    responses(
        (status = 200, description = "Station with its new status", body = GroundStation),
        (status = 404, description = "Station not found", body = ErrorResponse),
        (status = 409, description = "Built-in stations cannot be toggled", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn toggle_station(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<GroundStation>> {
    caller.require(Permission::ManageStations)?;

    let station = state.stations.write().await.toggle(&id)?;
    Ok(Json(station))
}
