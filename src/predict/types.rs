use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::coords::GeodeticPosition;

/// A contiguous interval during which a satellite stays above the elevation floor
/// of one ground station.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContactWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub max_elevation_deg: f64,
}

impl ContactWindow {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, max_elevation_deg: f64) -> Self {
        Self {
            start_time,
            end_time,
            duration_seconds: (end_time - start_time).num_seconds(),
            max_elevation_deg,
        }
    }
}

/// Passes of one satellite over one ground station.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StationPasses {
    pub ground_station_id: String,
    pub ground_station_name: String,
    pub passes: Vec<ContactWindow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SatelliteInfo {
    pub name: String,
    pub position: GeodeticPosition,
    /// inertial speed
    pub velocity_km_s: f64,
    pub category: String,
    pub norad_id: String,
    pub period_minutes: Option<f64>,
}
