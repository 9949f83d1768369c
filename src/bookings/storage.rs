use chrono::{DateTime, Utc};
use log::error;
use std::path::PathBuf;
use thiserror::Error;

use crate::bookings::{
    approval::{initial_status, ApprovalMode},
    types::{Booking, BookingRequest, BookingStatus, PricingConfig},
};
use crate::stations::GroundStation;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Validation(String),
    #[error("Booking not found: {0}")]
    NotFound(String),
    #[error("Ground station {0} has no free capacity in that time range")]
    CapacityExceeded(String),
    #[error("Cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
}

/// Bookings on disk, one YAML file per booking under a folder per status.
pub struct BookingStore {
    base: PathBuf,
}

impl BookingStore {
    pub fn new(base: PathBuf) -> Self {
        BookingStore { base }
    }

    fn status_path(&self, status: BookingStatus) -> PathBuf {
        self.base.join(status.folder_name())
    }

    fn booking_path(&self, status: BookingStatus, id: &str) -> PathBuf {
        self.status_path(status).join(format!("{}.yaml", id))
    }

    pub fn list(&self, status: BookingStatus) -> Result<Vec<Booking>, BookingError> {
        let path = self.status_path(status);

        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut bookings = Vec::new();
        for entry in path.read_dir()? {
            let entry = entry?;
            let entry_path = entry.path();

            if !entry_path.is_file() {
                continue;
            }

            let content = match std::fs::read_to_string(&entry_path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read booking file {}: {}", entry_path.display(), e);
                    continue;
                }
            };

            match serde_yaml::from_str::<Booking>(&content) {
                Ok(booking) => bookings.push(booking),
                Err(e) => error!("Failed to parse booking {}: {}", entry_path.display(), e),
            }
        }

        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }

    pub fn list_all(&self) -> Result<Vec<Booking>, BookingError> {
        let mut bookings = Vec::new();
        for status in BookingStatus::ALL {
            bookings.extend(self.list(status)?);
        }
        bookings.sort_by_key(|b| b.start);
        Ok(bookings)
    }

    pub fn get(&self, id: &str) -> Result<Booking, BookingError> {
        if !is_booking_id(id) {
            return Err(BookingError::NotFound(id.to_string()));
        }
        for status in BookingStatus::ALL {
            let path = self.booking_path(status, id);
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                return Ok(serde_yaml::from_str(&content)?);
            }
        }
        Err(BookingError::NotFound(id.to_string()))
    }

    /// Validates, prices and stores a new booking. Nothing is written if any check
    /// fails.
    pub fn submit(
        &self,
        request: &BookingRequest,
        requested_by: &str,
        stations: &[GroundStation],
        approval_mode: ApprovalMode,
        pricing: &PricingConfig,
    ) -> Result<Booking, BookingError> {
        request.validate(stations)?;
        self.check_capacity(
            request.start,
            request.end,
            &request.ground_station_ids,
            stations,
            None,
        )?;

        let duration_minutes = request.duration_minutes();
        let booking = Booking {
            id: self.generate_id(request.start),
            satellite: request.satellite.trim().to_string(),
            start: request.start,
            end: request.end,
            duration_minutes,
            price: pricing.price(duration_minutes, request.ground_station_ids.len()),
            status: initial_status(approval_mode),
            ground_station_ids: request.ground_station_ids.clone(),
            purpose: request.purpose.trim().to_string(),
            requested_by: Some(requested_by.to_string()),
            created_at: Utc::now(),
        };

        self.save(&booking)?;
        log::info!(
            "Booking {} for {} stored as {}",
            booking.id,
            booking.satellite,
            booking.status
        );
        Ok(booking)
    }

    pub fn approve(&self, id: &str, stations: &[GroundStation]) -> Result<Booking, BookingError> {
        self.transition(id, BookingStatus::Active, stations)
    }

    pub fn cancel(&self, id: &str) -> Result<Booking, BookingError> {
        self.transition(id, BookingStatus::Cancelled, &[])
    }

    pub fn complete(&self, id: &str) -> Result<Booking, BookingError> {
        self.transition(id, BookingStatus::Completed, &[])
    }

    /// Moves a booking to `next`. Activation re-checks capacity against the other
    /// bookings, since a pending booking may have been overtaken while it waited.
    pub fn transition(
        &self,
        id: &str,
        next: BookingStatus,
        stations: &[GroundStation],
    ) -> Result<Booking, BookingError> {
        let mut booking = self.get(id)?;
        let from = booking.status;
        if !from.can_transition_to(next) {
            return Err(BookingError::InvalidTransition { from, to: next });
        }

        if next == BookingStatus::Active {
            self.check_capacity(
                booking.start,
                booking.end,
                &booking.ground_station_ids,
                stations,
                Some(id),
            )?;
        }

        booking.status = next;
        self.save(&booking)?;
        std::fs::remove_file(self.booking_path(from, id))?;
        Ok(booking)
    }

    fn save(&self, booking: &Booking) -> Result<(), BookingError> {
        let folder = self.status_path(booking.status);
        std::fs::create_dir_all(&folder)?;

        let path = self.booking_path(booking.status, &booking.id);
        std::fs::write(path, serde_yaml::to_string(booking)?)?;
        Ok(())
    }

    fn check_capacity(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        station_ids: &[String],
        stations: &[GroundStation],
        exclude_id: Option<&str>,
    ) -> Result<(), BookingError> {
        let mut held = Vec::new();
        for status in BookingStatus::ALL.into_iter().filter(|s| s.holds_capacity()) {
            held.extend(self.list(status)?);
        }

        for station_id in station_ids {
            // Unknown stations were already rejected by validation, or the station
            // was removed since; either way there is nothing to count against.
            let Some(station) = stations.iter().find(|s| &s.id == station_id) else {
                continue;
            };

            let overlapping = held
                .iter()
                .filter(|b| exclude_id != Some(b.id.as_str()))
                .filter(|b| b.uses_station(station_id) && b.overlaps(start, end))
                .count();

            if overlapping >= station.capacity as usize {
                return Err(BookingError::CapacityExceeded(station_id.clone()));
            }
        }

        Ok(())
    }

    fn generate_id(&self, start: DateTime<Utc>) -> String {
        let uuid = uuid::Uuid::new_v4();
        let timestamp = start.format("%Y%m%dT%H%M%SZ");
        format!("{}_{}", timestamp, uuid)
    }
}

/// Ids are generated as `<timestamp>_<uuid>`; anything else, in particular a
/// path component, never names a stored booking.
fn is_booking_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn stations() -> Vec<GroundStation> {
        let mut wide = GroundStation::at("wide", "Wide", 0.0, 0.0);
        wide.capacity = 2;
        vec![GroundStation::at("narrow", "Narrow", 10.0, 10.0), wide]
    }

    fn request(offset_min: i64, length_min: i64, ids: &[&str]) -> BookingRequest {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        BookingRequest {
            satellite: "NOAA 19".into(),
            start: t0 + Duration::minutes(offset_min),
            end: t0 + Duration::minutes(offset_min + length_min),
            ground_station_ids: ids.iter().map(|s| s.to_string()).collect(),
            purpose: "weather imagery".into(),
        }
    }

    #[test]
    fn submit_prices_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookingStore::new(dir.path().to_path_buf());
        let pricing = PricingConfig {
            rate_per_minute: 3.0,
        };

        let booking = store
            .submit(
                &request(0, 10, &["narrow", "wide"]),
                "ops",
                &stations(),
                ApprovalMode::Auto,
                &pricing,
            )
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Active);
        assert_eq!(booking.duration_minutes, 10.0);
        assert_eq!(booking.price, 60.0);

        let loaded = store.get(&booking.id).unwrap();
        assert_eq!(loaded.ground_station_ids, vec!["narrow", "wide"]);
        assert_eq!(loaded.requested_by.as_deref(), Some("ops"));
        assert_eq!(store.list(BookingStatus::Active).unwrap().len(), 1);
    }

    #[test]
    fn invalid_request_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookingStore::new(dir.path().to_path_buf());
        let result = store.submit(
            &request(0, 10, &["nowhere"]),
            "ops",
            &stations(),
            ApprovalMode::Auto,
            &PricingConfig::default(),
        );
        assert!(matches!(result, Err(BookingError::Validation(_))));
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn capacity_is_enforced_per_station() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookingStore::new(dir.path().to_path_buf());
        let stations = stations();
        let pricing = PricingConfig::default();
        let submit = |req: BookingRequest| {
            store.submit(&req, "ops", &stations, ApprovalMode::Manual, &pricing)
        };

        submit(request(0, 30, &["narrow"])).unwrap();
        assert!(matches!(
            submit(request(10, 30, &["narrow"])),
            Err(BookingError::CapacityExceeded(id)) if id == "narrow"
        ));
        // back to back does not overlap
        submit(request(30, 10, &["narrow"])).unwrap();

        submit(request(0, 30, &["wide"])).unwrap();
        submit(request(5, 30, &["wide"])).unwrap();
        assert!(submit(request(10, 5, &["wide"])).is_err());
    }

    #[test]
    fn cancelled_bookings_free_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookingStore::new(dir.path().to_path_buf());
        let stations = stations();
        let pricing = PricingConfig::default();

        let first = store
            .submit(
                &request(0, 30, &["narrow"]),
                "ops",
                &stations,
                ApprovalMode::Auto,
                &pricing,
            )
            .unwrap();
        store.cancel(&first.id).unwrap();
        store
            .submit(
                &request(0, 30, &["narrow"]),
                "ops",
                &stations,
                ApprovalMode::Auto,
                &pricing,
            )
            .unwrap();
        assert_eq!(store.list(BookingStatus::Cancelled).unwrap().len(), 1);
    }

    #[test]
    fn lifecycle_and_invalid_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookingStore::new(dir.path().to_path_buf());
        let stations = stations();

        let booking = store
            .submit(
                &request(0, 15, &["narrow"]),
                "ops",
                &stations,
                ApprovalMode::Manual,
                &PricingConfig::default(),
            )
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);

        assert!(matches!(
            store.complete(&booking.id),
            Err(BookingError::InvalidTransition { .. })
        ));

        let approved = store.approve(&booking.id, &stations).unwrap();
        assert_eq!(approved.status, BookingStatus::Active);
        assert!(store.list(BookingStatus::Pending).unwrap().is_empty());

        let done = store.complete(&booking.id).unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert!(matches!(
            store.cancel(&booking.id),
            Err(BookingError::InvalidTransition {
                from: BookingStatus::Completed,
                to: BookingStatus::Cancelled
            })
        ));
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert!(matches!(store.get("missing"), Err(BookingError::NotFound(_))));
    }

    #[test]
    fn ids_outside_the_store_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("data").join("bookings");
        let store = BookingStore::new(base);
        let stations = stations();

        let booking = store
            .submit(
                &request(0, 15, &["narrow"]),
                "ops",
                &stations,
                ApprovalMode::Auto,
                &PricingConfig::default(),
            )
            .unwrap();
        let outside = dir.path().join("data").join("victim.yaml");
        std::fs::write(&outside, serde_yaml::to_string(&booking).unwrap()).unwrap();

        for id in ["../../victim", "..", "active/../../victim", "a\\b", ""] {
            assert!(matches!(store.get(id), Err(BookingError::NotFound(_))), "{}", id);
            assert!(matches!(store.cancel(id), Err(BookingError::NotFound(_))), "{}", id);
        }
        assert!(outside.exists());
        assert_eq!(store.get(&booking.id).unwrap().id, booking.id);
    }
}
