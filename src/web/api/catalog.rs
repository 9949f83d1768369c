use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::catalog::{Availability, Catalog, CatalogEntry, CategoryCount};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::Caller;
use crate::web::config::Permission;
use crate::web::state::AppState;

/// Current catalog snapshot, or `Unavailable` until the first load completes.
pub async fn loaded_catalog(state: &AppState) -> ApiResult<Arc<Catalog>> {
    state
        .catalog
        .read()
        .await
        .catalog()
        .ok_or(ApiError::Unavailable)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogStatusResponse {
    pub availability: Availability,
    pub satellite_count: usize,
    /// Satellites whose elements SGP4 accepted.
    pub propagatable_count: usize,
    pub loaded_at: Option<DateTime<Utc>>,
    pub failed_sources: Vec<String>,
    pub categories: Vec<CategoryCount>,
}

#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog status", body = CatalogStatusResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn status(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<CatalogStatusResponse>> {
    caller.require(Permission::ViewPredictions)?;

    let catalog_state = state.catalog.read().await;
    let availability = catalog_state.availability();
    let response = match catalog_state.catalog() {
        Some(catalog) => CatalogStatusResponse {
            availability,
            satellite_count: catalog.len(),
            propagatable_count: catalog.propagatable(),
            loaded_at: Some(catalog.loaded_at()),
            failed_sources: catalog.failed_sources().to_vec(),
            categories: catalog.categories(),
        },
        None => CatalogStatusResponse {
            availability,
            satellite_count: 0,
            propagatable_count: 0,
            loaded_at: None,
            failed_sources: Vec::new(),
            categories: Vec::new(),
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SatelliteListQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/catalog/satellites",
    tag = "catalog",
    params(
        ("category" = Option<String>, Query, description = "Only satellites from this category"),
        ("limit" = Option<usize>, Query, description = "Maximum entries (defaults to the configured display cap)")
    ),
    responses(
        (status = 200, description = "Catalog entries", body = Vec<CatalogEntry>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions"),
        (status = 503, description = "Catalog still loading", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn list_satellites(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<SatelliteListQuery>,
) -> ApiResult<Json<Vec<CatalogEntry>>> {
    caller.require(Permission::ViewPredictions)?;

    let catalog = loaded_catalog(&state).await?;
    let limit = query.limit.or(state.config.catalog.max_display);

    let entries = match query.category.as_deref() {
        Some(category) => catalog
            .entries()
            .iter()
            .filter(|e| e.category == category)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect(),
        None => catalog.display(limit).to_vec(),
    };

    Ok(Json(entries))
}
