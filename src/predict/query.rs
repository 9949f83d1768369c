//! Query surface consumed by renderers and the HTTP layer. Every function is a pure
//! read over its inputs; per-satellite failures come back as `None` or an empty list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::abort::AbortFlag;
use crate::catalog::{Catalog, CatalogEntry};
use crate::predict::coords::{
    eci_to_geodetic, km_to_scene, satellite_scene_point, ScenePoint, EARTH_RADIUS_KM,
};
use crate::predict::error::PredictError;
use crate::predict::pass_finder::{
    accessible_ground_stations, predict_passes, visible_elevation, PassPolicy,
    DEFAULT_HORIZON_HOURS,
};
use crate::predict::propagation::{CompiledOrbit, Ephemeris};
use crate::predict::visibility::is_within_range;
use crate::predict::types::{SatelliteInfo, StationPasses};
use crate::stations::GroundStation;

/// Scene-space position of a satellite, or `None` if it cannot be propagated to
/// `instant`.
pub fn calculate_satellite_position(
    orbit: &CompiledOrbit,
    instant: Option<DateTime<Utc>>,
    scene_radius: f64,
) -> Option<ScenePoint> {
    let instant = instant.unwrap_or_else(Utc::now);
    match orbit.propagate(instant) {
        Ok(state) => {
            let geo = eci_to_geodetic(state.position_km, instant);
            Some(satellite_scene_point(&geo, scene_radius))
        }
        Err(e) => {
            log::debug!("No position for {}: {}", orbit.source().name, e);
            None
        }
    }
}

/// Raw inertial position scaled into scene units, without Earth rotation. Useful
/// for orbit plots where the scene does not spin with the planet.
pub fn calculate_inertial_position(
    orbit: &CompiledOrbit,
    instant: Option<DateTime<Utc>>,
    scene_radius: f64,
) -> Option<ScenePoint> {
    let instant = instant.unwrap_or_else(Utc::now);
    orbit
        .propagate(instant)
        .ok()
        .map(|state| km_to_scene(state.position_km, scene_radius))
}

pub fn get_satellite_info(
    catalog: &Catalog,
    entry: &CatalogEntry,
    instant: Option<DateTime<Utc>>,
) -> Option<SatelliteInfo> {
    let instant = instant.unwrap_or_else(Utc::now);
    let orbit = catalog.orbit(entry)?;
    let state = orbit.propagate(instant).ok()?;

    Some(SatelliteInfo {
        name: entry.elements.name.clone(),
        position: eci_to_geodetic(state.position_km, instant),
        velocity_km_s: state.speed_km_s(),
        category: entry.category.clone(),
        norad_id: entry.elements.catalog_number.clone(),
        period_minutes: entry.elements.orbital_period_minutes(),
    })
}

/// Passes from `start` (default now) over `horizon_hours` (default 24).
pub fn predict_satellite_passes(
    orbit: &CompiledOrbit,
    stations: &[GroundStation],
    start: Option<DateTime<Utc>>,
    horizon_hours: Option<f64>,
    policy: &PassPolicy,
) -> Result<Vec<StationPasses>, PredictError> {
    predict_passes(
        orbit,
        stations,
        start.unwrap_or_else(Utc::now),
        horizon_hours.unwrap_or(DEFAULT_HORIZON_HOURS),
        policy,
    )
}

pub fn get_accessible_ground_stations(
    orbit: &CompiledOrbit,
    stations: &[GroundStation],
    horizon_hours: Option<f64>,
    policy: &PassPolicy,
) -> Result<Vec<String>, PredictError> {
    accessible_ground_stations(
        orbit,
        stations,
        Utc::now(),
        horizon_hours.unwrap_or(DEFAULT_HORIZON_HOURS),
        policy,
    )
}

/// Default radius for [`get_nearby_ground_stations`], roughly the slant range to a
/// LEO satellite near the horizon.
pub const DEFAULT_NEARBY_RANGE_KM: f64 = 2500.0;

/// Stations that see the satellite at `instant` under the full elevation test.
/// `None` if the satellite cannot be propagated.
pub fn get_visible_ground_stations(
    orbit: &CompiledOrbit,
    stations: &[GroundStation],
    instant: DateTime<Utc>,
    policy: &PassPolicy,
) -> Option<Vec<String>> {
    let position = orbit.geodetic_at(instant).ok()?;
    Some(
        stations
            .iter()
            .filter(|station| {
                let gs = station.scene_position(policy.scene_radius);
                visible_elevation(&position, station, &gs, policy).is_some()
            })
            .map(|station| station.id.clone())
            .collect(),
    )
}

/// Coarse check: stations within `range_km` straight-line distance of the
/// satellite, horizon ignored.
pub fn get_nearby_ground_stations(
    orbit: &CompiledOrbit,
    stations: &[GroundStation],
    instant: DateTime<Utc>,
    range_km: f64,
    scene_radius: f64,
) -> Option<Vec<String>> {
    let position = orbit.geodetic_at(instant).ok()?;
    let sat = satellite_scene_point(&position, scene_radius);
    let max_distance = range_km * scene_radius / EARTH_RADIUS_KM;
    Some(
        stations
            .iter()
            .filter(|station| {
                let gs = station.scene_position(scene_radius);
                is_within_range(&sat, &gs, max_distance)
            })
            .map(|station| station.id.clone())
            .collect(),
    )
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SatellitePasses {
    pub satellite: String,
    pub norad_id: String,
    pub stations: Vec<StationPasses>,
}

/// Pass prediction over many satellites. `abort` is checked once per satellite;
/// satellites without a usable orbit are skipped.
pub fn predict_catalog_passes<'a>(
    catalog: &Catalog,
    entries: impl IntoIterator<Item = &'a CatalogEntry>,
    stations: &[GroundStation],
    start: DateTime<Utc>,
    horizon_hours: f64,
    policy: &PassPolicy,
    abort: &AbortFlag,
) -> Result<Vec<SatellitePasses>, PredictError> {
    let mut result = Vec::new();
    for entry in entries {
        if abort.is_aborted() {
            return Err(PredictError::Aborted);
        }
        let Some(orbit) = catalog.orbit(entry) else {
            continue;
        };

        let passes = predict_passes(orbit.as_ref(), stations, start, horizon_hours, policy)?;
        if !passes.is_empty() {
            result.push(SatellitePasses {
                satellite: entry.elements.name.clone(),
                norad_id: entry.elements.catalog_number.clone(),
                stations: passes,
            });
        }
    }
    Ok(result)
}
