use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::stations::ground_station::{builtin_roster, GroundStation, StationStatus};

#[derive(Debug, Error)]
pub enum StationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Station not found: {0}")]
    NotFound(String),
    #[error("Built-in station {0} cannot be modified")]
    BuiltIn(String),
}

/// Registration form for a user-defined station.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StationRequest {
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub antenna_type: String,
    #[serde(default)]
    pub frequency_band: String,
    #[serde(default)]
    pub rating: Option<f32>,
}

fn default_capacity() -> u32 {
    1
}

impl StationRequest {
    pub fn validate(&self) -> Result<(), StationError> {
        let fail = |msg: &str| Err(StationError::Validation(msg.to_string()));
        if self.name.trim().is_empty() {
            return fail("name is required");
        }
        if !self.latitude_deg.is_finite() || !(-90.0..=90.0).contains(&self.latitude_deg) {
            return fail("latitude must be between -90 and 90 degrees");
        }
        if !self.longitude_deg.is_finite() || !(-180.0..=180.0).contains(&self.longitude_deg) {
            return fail("longitude must be between -180 and 180 degrees");
        }
        if self.capacity == 0 {
            return fail("capacity must be at least 1");
        }
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return fail("rating must be between 0 and 5");
            }
        }
        Ok(())
    }
}

/// Built-in roster plus the session's own stations. Custom stations are written
/// to `path` after every change; a failed write leaves the registry untouched.
pub struct StationRegistry {
    builtin: Vec<GroundStation>,
    custom: Vec<GroundStation>,
    path: Option<PathBuf>,
}

impl StationRegistry {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            builtin: builtin_roster(),
            custom: Vec::new(),
            path: None,
        }
    }

    pub fn open(path: PathBuf) -> Result<Self, StationError> {
        let custom = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let stations: Vec<GroundStation> = serde_yaml::from_str(&content)?;
            stations
                .into_iter()
                .map(|mut s| {
                    s.custom = true;
                    s
                })
                .collect()
        } else {
            Vec::new()
        };

        log::info!("Loaded {} custom ground stations", custom.len());
        Ok(Self {
            builtin: builtin_roster(),
            custom,
            path: Some(path),
        })
    }

    pub fn all(&self) -> Vec<GroundStation> {
        self.builtin.iter().chain(self.custom.iter()).cloned().collect()
    }

    pub fn online(&self) -> Vec<GroundStation> {
        self.builtin
            .iter()
            .chain(self.custom.iter())
            .filter(|s| s.is_online())
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&GroundStation> {
        self.builtin
            .iter()
            .chain(self.custom.iter())
            .find(|s| s.id == id)
    }

    pub fn register(&mut self, request: StationRequest) -> Result<GroundStation, StationError> {
        request.validate()?;

        let station = GroundStation {
            id: format!("custom-{}", uuid::Uuid::new_v4()),
            name: request.name.trim().to_string(),
            latitude_deg: request.latitude_deg,
            longitude_deg: request.longitude_deg,
            city: request.city,
            country: request.country,
            status: StationStatus::Online,
            capacity: request.capacity,
            antenna_type: request.antenna_type,
            frequency_band: request.frequency_band,
            rating: request.rating,
            custom: true,
            created_at: Some(Utc::now()),
        };

        let mut custom = self.custom.clone();
        custom.push(station.clone());
        self.commit(custom)?;
        log::info!("Registered ground station {} ({})", station.name, station.id);
        Ok(station)
    }

    pub fn remove(&mut self, id: &str) -> Result<GroundStation, StationError> {
        let index = self.custom_index(id)?;
        let mut custom = self.custom.clone();
        let removed = custom.remove(index);
        self.commit(custom)?;
        Ok(removed)
    }

    /// Online <-> offline. A station under maintenance comes back online.
    pub fn toggle(&mut self, id: &str) -> Result<GroundStation, StationError> {
        let index = self.custom_index(id)?;
        let mut custom = self.custom.clone();
        let station = &mut custom[index];
        station.status = match station.status {
            StationStatus::Online => StationStatus::Offline,
            StationStatus::Offline | StationStatus::Maintenance => StationStatus::Online,
        };
        let toggled = station.clone();
        self.commit(custom)?;
        Ok(toggled)
    }

    fn custom_index(&self, id: &str) -> Result<usize, StationError> {
        if self.builtin.iter().any(|s| s.id == id) {
            return Err(StationError::BuiltIn(id.to_string()));
        }
        self.custom
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StationError::NotFound(id.to_string()))
    }

    fn commit(&mut self, custom: Vec<GroundStation>) -> Result<(), StationError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_yaml::to_string(&custom)?)?;
        }
        self.custom = custom;
        Ok(())
    }
}
