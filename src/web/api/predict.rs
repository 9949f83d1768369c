use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::abort::AbortFlag;
use crate::catalog::{Catalog, CatalogEntry};
use crate::predict::coords::ScenePoint;
use crate::predict::{
    calculate_inertial_position, calculate_satellite_position, get_accessible_ground_stations,
    get_nearby_ground_stations, get_satellite_info, get_visible_ground_stations,
    passes_to_csv_string, predict_catalog_passes, predict_satellite_passes, CompiledOrbit,
    SatelliteInfo, SatellitePasses, StationPasses, DEFAULT_HORIZON_HOURS,
    DEFAULT_NEARBY_RANGE_KM,
};
use crate::stations::GroundStation;
use crate::web::api::catalog::loaded_catalog;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::Caller;
use crate::web::config::Permission;
use crate::web::state::AppState;

fn find_satellite(
    catalog: &Catalog,
    norad_id: &str,
) -> ApiResult<(CatalogEntry, Arc<CompiledOrbit>)> {
    let entry = catalog
        .find(norad_id)
        .ok_or(ApiError::NotFound("satellite_not_found"))?;
    let orbit = catalog.orbit(entry).ok_or_else(|| {
        ApiError::Validation(format!(
            "Satellite {} has no usable orbital elements",
            entry.elements.name
        ))
    })?;
    Ok((entry.clone(), orbit))
}

async fn online_stations(state: &AppState) -> Vec<GroundStation> {
    state.stations.read().await.online()
}

#[utoipa::path(
    get,
    path = "/api/satellites/{norad_id}",
    tag = "predict",
    params(
        ("norad_id" = String, Path, description = "NORAD catalog number"),
        ("at" = Option<String>, Query, description = "Instant (RFC3339), defaults to now")
    ),
    responses(
        (status = 200, description = "Satellite state", body = SatelliteInfo),
        (status = 404, description = "Unknown or unpropagatable satellite", body = ErrorResponse),
        (status = 503, description = "Catalog still loading", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn satellite_info(
    State(state): State<AppState>,
    caller: Caller,
    Path(norad_id): Path<String>,
    Query(query): Query<InstantQuery>,
) -> ApiResult<Json<SatelliteInfo>> {
    caller.require(Permission::ViewPredictions)?;

    let catalog = loaded_catalog(&state).await?;
    let entry = catalog
        .find(&norad_id)
        .ok_or(ApiError::NotFound("satellite_not_found"))?;
    let info = get_satellite_info(&catalog, entry, query.at)
        .ok_or(ApiError::NotFound("satellite_not_propagatable"))?;

    Ok(Json(info))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InstantQuery {
    #[serde(default, deserialize_with = "deserialize_option_datetime")]
    pub at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scene_radius: Option<f64>,
    #[serde(default)]
    pub frame: PositionFrame,
}

/// `earth_fixed` places the satellite over its ground point on the same sphere as
/// the stations; `inertial` is the raw SGP4 vector on the same scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PositionFrame {
    #[default]
    EarthFixed,
    Inertial,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PositionResponse {
    pub norad_id: String,
    pub name: String,
    pub at: DateTime<Utc>,
    pub frame: PositionFrame,
    pub position: ScenePoint,
}

#[utoipa::path(
    get,
    path = "/api/satellites/{norad_id}/position",
    tag = "predict",
    params(
        ("norad_id" = String, Path, description = "NORAD catalog number"),
        ("at" = Option<String>, Query, description = "Instant (RFC3339), defaults to now"),
        ("scene_radius" = Option<f64>, Query, description = "Scene-space Earth radius"),
        ("frame" = Option<PositionFrame>, Query, description = "earth_fixed (default) or inertial")
    ),
    responses(
        (status = 200, description = "Scene-space position", body = PositionResponse),
        (status = 404, description = "Unknown or unpropagatable satellite", body = ErrorResponse),
        (status = 503, description = "Catalog still loading", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn satellite_position(
    State(state): State<AppState>,
    caller: Caller,
    Path(norad_id): Path<String>,
    Query(query): Query<InstantQuery>,
) -> ApiResult<Json<PositionResponse>> {
    caller.require(Permission::ViewPredictions)?;

    let catalog = loaded_catalog(&state).await?;
    let (entry, orbit) = find_satellite(&catalog, &norad_id)?;
    let at = query.at.unwrap_or_else(Utc::now);
    let radius = query.scene_radius.unwrap_or(state.policy.scene_radius);
    let position = match query.frame {
        PositionFrame::EarthFixed => calculate_satellite_position(&orbit, Some(at), radius),
        PositionFrame::Inertial => calculate_inertial_position(&orbit, Some(at), radius),
    }
    .ok_or(ApiError::NotFound("satellite_not_propagatable"))?;

    Ok(Json(PositionResponse {
        norad_id: entry.elements.catalog_number,
        name: entry.elements.name,
        at,
        frame: query.frame,
        position,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PassQuery {
    #[serde(default, deserialize_with = "deserialize_option_datetime")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hours: Option<f64>,
    /// `json` (default) or `csv`
    #[serde(default)]
    pub format: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/satellites/{norad_id}/passes",
    tag = "predict",
    params(
        ("norad_id" = String, Path, description = "NORAD catalog number"),
        ("start" = Option<String>, Query, description = "Window start (RFC3339), defaults to now"),
        ("hours" = Option<f64>, Query, description = "Prediction horizon in hours, default 24"),
        ("format" = Option<String>, Query, description = "json or csv")
    ),
    responses(
        (status = 200, description = "Contact windows per online station", body = Vec<StationPasses>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Unknown satellite", body = ErrorResponse),
        (status = 503, description = "Catalog still loading", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn satellite_passes(
    State(state): State<AppState>,
    caller: Caller,
    Path(norad_id): Path<String>,
    Query(query): Query<PassQuery>,
) -> ApiResult<Response> {
    caller.require(Permission::ViewPredictions)?;

    let catalog = loaded_catalog(&state).await?;
    let (_, orbit) = find_satellite(&catalog, &norad_id)?;
    let stations = online_stations(&state).await;
    let policy = state.policy.clone();

    let passes = tokio::task::spawn_blocking(move || {
        predict_satellite_passes(&orbit, &stations, query.start, query.hours, &policy)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    match query.format.as_deref() {
        Some("csv") => {
            let body =
                passes_to_csv_string(&passes).map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"passes-{}.csv\"", norad_id),
                    ),
                ],
                body,
            )
                .into_response())
        }
        None | Some("json") => Ok(Json(passes).into_response()),
        Some(other) => Err(ApiError::Validation(format!("Unknown format {}", other))),
    }
}

/// How `/stations` decides that a station can reach the satellite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StationMode {
    /// At least one pass within `hours`.
    #[default]
    Passes,
    /// Above the elevation floor at `at`.
    Visible,
    /// Within `range_km` straight-line distance at `at`, horizon ignored.
    Nearby,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StationQuery {
    #[serde(default)]
    pub mode: StationMode,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_option_datetime")]
    pub at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub range_km: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/api/satellites/{norad_id}/stations",
    tag = "predict",
    params(
        ("norad_id" = String, Path, description = "NORAD catalog number"),
        ("mode" = Option<StationMode>, Query, description = "passes (default), visible or nearby"),
        ("hours" = Option<f64>, Query, description = "Prediction horizon in hours for mode=passes, default 24"),
        ("at" = Option<String>, Query, description = "Instant (RFC3339) for visible/nearby, defaults to now"),
        ("range_km" = Option<f64>, Query, description = "Distance for mode=nearby, default 2500")
    ),
    responses(
        (status = 200, description = "Ids of stations that can reach the satellite", body = Vec<String>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Unknown satellite", body = ErrorResponse),
        (status = 503, description = "Catalog still loading", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn accessible_stations(
    State(state): State<AppState>,
    caller: Caller,
    Path(norad_id): Path<String>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Json<Vec<String>>> {
    caller.require(Permission::ViewPredictions)?;

    let catalog = loaded_catalog(&state).await?;
    let (_, orbit) = find_satellite(&catalog, &norad_id)?;
    let stations = online_stations(&state).await;
    let policy = state.policy.clone();
    let at = query.at.unwrap_or_else(Utc::now);

    let ids = match query.mode {
        StationMode::Passes => tokio::task::spawn_blocking(move || {
            get_accessible_ground_stations(&orbit, &stations, query.hours, &policy)
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??,
        StationMode::Visible => get_visible_ground_stations(&orbit, &stations, at, &policy)
            .ok_or(ApiError::NotFound("satellite_not_propagatable"))?,
        StationMode::Nearby => {
            let range_km = query.range_km.unwrap_or(DEFAULT_NEARBY_RANGE_KM);
            if !range_km.is_finite() || range_km < 0.0 {
                return Err(ApiError::Validation(format!("Invalid range_km {}", range_km)));
            }
            get_nearby_ground_stations(&orbit, &stations, at, range_km, policy.scene_radius)
                .ok_or(ApiError::NotFound("satellite_not_propagatable"))?
        }
    };

    Ok(Json(ids))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CatalogPassQuery {
    #[serde(default, deserialize_with = "deserialize_option_datetime")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Raises the flag when the request future is dropped, so a disconnected client
/// stops the blocking sweep at its next checkpoint.
struct AbortOnDrop(AbortFlag);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[utoipa::path(
    get,
    path = "/api/passes",
    tag = "predict",
    params(
        ("start" = Option<String>, Query, description = "Window start (RFC3339), defaults to now"),
        ("hours" = Option<f64>, Query, description = "Prediction horizon in hours, default 24"),
        ("category" = Option<String>, Query, description = "Only satellites from this category"),
        ("limit" = Option<usize>, Query, description = "Maximum satellites considered")
    ),
    responses(
        (status = 200, description = "Passes for every satellite that has any", body = Vec<SatellitePasses>),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 503, description = "Catalog still loading", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn catalog_passes(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<CatalogPassQuery>,
) -> ApiResult<Json<Vec<SatellitePasses>>> {
    caller.require(Permission::ViewPredictions)?;

    let catalog = loaded_catalog(&state).await?;
    let stations = online_stations(&state).await;
    let policy = state.policy.clone();
    let limit = query.limit.or(state.config.catalog.max_display);
    let guard = AbortOnDrop(AbortFlag::new());
    let abort = guard.0.clone();

    let result = tokio::task::spawn_blocking(move || {
        let entries = catalog
            .entries()
            .iter()
            .filter(|e| query.category.as_deref().is_none_or(|c| e.category == c))
            .take(limit.unwrap_or(usize::MAX));
        predict_catalog_passes(
            &catalog,
            entries,
            &stations,
            query.start.unwrap_or_else(Utc::now),
            query.hours.unwrap_or(DEFAULT_HORIZON_HOURS),
            &policy,
            &abort,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(result))
}

fn deserialize_option_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
