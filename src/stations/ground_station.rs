use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use crate::predict::coords::{geodetic_to_scene, ScenePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StationStatus {
    Online,
    Offline,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GroundStation {
    pub id: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    pub status: StationStatus,
    /// maximum simultaneous links
    pub capacity: u32,
    #[serde(default)]
    pub antenna_type: String,
    #[serde(default)]
    pub frequency_band: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl GroundStation {
    /// Minimal online station at the given location.
    pub fn at(id: &str, name: &str, latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            latitude_deg,
            longitude_deg,
            city: String::new(),
            country: String::new(),
            status: StationStatus::Online,
            capacity: 1,
            antenna_type: String::new(),
            frequency_band: String::new(),
            rating: None,
            custom: false,
            created_at: None,
        }
    }

    /// Parse `"lat, lon"`.
    pub fn from_coordinates(id: &str, coordinates: &str) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let lat: f64 = parts[0].parse().ok()?;
        let lon: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return None;
        }
        Some(Self::at(id, id, lat, lon))
    }

    pub fn is_online(&self) -> bool {
        self.status == StationStatus::Online
    }

    pub fn scene_position(&self, scene_radius: f64) -> ScenePoint {
        geodetic_to_scene(self.latitude_deg, self.longitude_deg, scene_radius)
    }
}

struct BuiltinStation {
    id: &'static str,
    name: &'static str,
    lat: f64,
    lon: f64,
    city: &'static str,
    country: &'static str,
    status: StationStatus,
    capacity: u32,
    antenna: &'static str,
    band: &'static str,
    rating: f32,
}

const BUILTIN: &[BuiltinStation] = &[
    BuiltinStation { id: "svalbard", name: "Svalbard Satellite Station", lat: 78.2306, lon: 15.3894, city: "Longyearbyen", country: "Norway", status: StationStatus::Online, capacity: 8, antenna: "13m parabolic", band: "S/X-band", rating: 4.9 },
    BuiltinStation { id: "kiruna", name: "Esrange Kiruna", lat: 67.8833, lon: 21.0667, city: "Kiruna", country: "Sweden", status: StationStatus::Online, capacity: 4, antenna: "13m parabolic", band: "S/X-band", rating: 4.7 },
    BuiltinStation { id: "fairbanks", name: "Fairbanks Ground Station", lat: 64.8594, lon: -147.8497, city: "Fairbanks", country: "USA", status: StationStatus::Online, capacity: 4, antenna: "11m parabolic", band: "S/X-band", rating: 4.6 },
    BuiltinStation { id: "weilheim", name: "Weilheim Ground Station", lat: 47.8813, lon: 11.0781, city: "Weilheim", country: "Germany", status: StationStatus::Online, capacity: 3, antenna: "15m parabolic", band: "S/Ku-band", rating: 4.5 },
    BuiltinStation { id: "wallops", name: "Wallops Flight Facility", lat: 37.9402, lon: -75.4664, city: "Wallops Island", country: "USA", status: StationStatus::Online, capacity: 4, antenna: "11m parabolic", band: "S/X-band", rating: 4.6 },
    BuiltinStation { id: "singapore", name: "Singapore Teleport", lat: 1.3521, lon: 103.8198, city: "Singapore", country: "Singapore", status: StationStatus::Online, capacity: 2, antenna: "9m parabolic", band: "Ku/Ka-band", rating: 4.3 },
    BuiltinStation { id: "hartebeesthoek", name: "Hartebeesthoek", lat: -25.8872, lon: 27.7075, city: "Hartebeesthoek", country: "South Africa", status: StationStatus::Online, capacity: 3, antenna: "12m parabolic", band: "S/X-band", rating: 4.4 },
    BuiltinStation { id: "santiago", name: "Santiago Satellite Station", lat: -33.1511, lon: -70.6664, city: "Santiago", country: "Chile", status: StationStatus::Maintenance, capacity: 2, antenna: "9m parabolic", band: "S-band", rating: 4.1 },
    BuiltinStation { id: "perth", name: "Perth Tracking Station", lat: -31.8021, lon: 115.8856, city: "Perth", country: "Australia", status: StationStatus::Online, capacity: 3, antenna: "13m parabolic", band: "S/X-band", rating: 4.5 },
    BuiltinStation { id: "mcmurdo", name: "McMurdo Ground Station", lat: -77.8391, lon: 166.6671, city: "McMurdo", country: "Antarctica", status: StationStatus::Offline, capacity: 1, antenna: "10m parabolic", band: "S/X-band", rating: 3.9 },
];

/// The fixed roster every session starts with.
pub fn builtin_roster() -> Vec<GroundStation> {
    BUILTIN
        .iter()
        .map(|b| GroundStation {
            id: b.id.to_string(),
            name: b.name.to_string(),
            latitude_deg: b.lat,
            longitude_deg: b.lon,
            city: b.city.to_string(),
            country: b.country.to_string(),
            status: b.status,
            capacity: b.capacity,
            antenna_type: b.antenna.to_string(),
            frequency_band: b.band.to_string(),
            rating: Some(b.rating),
            custom: false,
            created_at: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinates() {
        let gs = GroundStation::from_coordinates("home", " 48.1, 11.6 ").unwrap();
        assert_eq!(gs.latitude_deg, 48.1);
        assert_eq!(gs.longitude_deg, 11.6);
        assert!(gs.is_online());

        assert!(GroundStation::from_coordinates("x", "48.1").is_none());
        assert!(GroundStation::from_coordinates("x", "95.0, 0").is_none());
        assert!(GroundStation::from_coordinates("x", "a, b").is_none());
    }

    #[test]
    fn builtin_roster_is_well_formed() {
        let roster = builtin_roster();
        assert_eq!(roster.len(), BUILTIN.len());
        let mut ids: Vec<_> = roster.iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), roster.len());
        assert!(roster.iter().all(|s| !s.custom && s.capacity > 0));
        assert!(roster.iter().any(|s| s.status == StationStatus::Maintenance));
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(StationStatus::Maintenance.to_string(), "maintenance");
    }
}
