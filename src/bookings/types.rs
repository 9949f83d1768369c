use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use crate::bookings::storage::BookingError;
use crate::stations::GroundStation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Active,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn folder_name(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Active => "Active",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Active)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Active, BookingStatus::Cancelled)
                | (BookingStatus::Active, BookingStatus::Completed)
        )
    }

    /// Pending and active bookings hold station capacity.
    pub fn holds_capacity(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: String,
    pub satellite: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: f64,
    pub price: f64,
    pub status: BookingStatus,
    pub ground_station_ids: Vec<String>,
    pub purpose: String,
    /// Name of the API key that submitted the booking.
    #[serde(default)]
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && self.start < end
    }

    pub fn uses_station(&self, id: &str) -> bool {
        self.ground_station_ids.iter().any(|s| s == id)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookingRequest {
    pub satellite: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub ground_station_ids: Vec<String>,
    pub purpose: String,
}

impl BookingRequest {
    pub fn validate(&self, stations: &[GroundStation]) -> Result<(), BookingError> {
        let fail = |msg: String| Err(BookingError::Validation(msg));
        if self.satellite.trim().is_empty() {
            return fail("satellite is required".into());
        }
        if self.purpose.trim().is_empty() {
            return fail("purpose is required".into());
        }
        if self.end <= self.start {
            return fail("end must be after start".into());
        }
        if self.ground_station_ids.is_empty() {
            return fail("at least one ground station is required".into());
        }

        let mut seen = HashSet::new();
        for id in &self.ground_station_ids {
            if !seen.insert(id.as_str()) {
                return fail(format!("ground station {} listed twice", id));
            }
            if !stations.iter().any(|s| &s.id == id) {
                return fail(format!("unknown ground station {}", id));
            }
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 60.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_rate")]
    pub rate_per_minute: f64,
}

fn default_rate() -> f64 {
    10.0
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            rate_per_minute: default_rate(),
        }
    }
}

impl PricingConfig {
    /// Every station in a booking is billed for the whole duration.
    pub fn price(&self, duration_minutes: f64, station_count: usize) -> f64 {
        let raw = duration_minutes * self.rate_per_minute * station_count as f64;
        (raw * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn request(stations: &[&str]) -> BookingRequest {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        BookingRequest {
            satellite: "ISS (ZARYA)".into(),
            start,
            end: start + Duration::minutes(12),
            ground_station_ids: stations.iter().map(|s| s.to_string()).collect(),
            purpose: "telemetry".into(),
        }
    }

    fn roster() -> Vec<GroundStation> {
        vec![
            GroundStation::at("a", "A", 10.0, 10.0),
            GroundStation::at("b", "B", 20.0, 20.0),
        ]
    }

    #[test]
    fn transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn validation() {
        let roster = roster();
        assert!(request(&["a", "b"]).validate(&roster).is_ok());

        let mut missing_purpose = request(&["a"]);
        missing_purpose.purpose = "  ".into();
        let mut reversed = request(&["a"]);
        std::mem::swap(&mut reversed.start, &mut reversed.end);

        for bad in [
            request(&[]),
            request(&["a", "a"]),
            request(&["zzz"]),
            missing_purpose,
            reversed,
        ] {
            assert!(matches!(bad.validate(&roster), Err(BookingError::Validation(_))));
        }
    }

    #[test]
    fn price_scales_with_stations() {
        let pricing = PricingConfig {
            rate_per_minute: 2.5,
        };
        let req = request(&["a", "b"]);
        assert_eq!(req.duration_minutes(), 12.0);
        assert_eq!(pricing.price(req.duration_minutes(), 2), 60.0);
        assert_eq!(pricing.price(1.0 / 3.0, 1), 0.83);
    }
}
