use chrono::{DateTime, Duration, Utc};

use crate::abort::AbortFlag;
use crate::predict::coords::{satellite_scene_point, GeodeticPosition, ScenePoint};
use crate::predict::error::PredictError;
use crate::predict::propagation::Ephemeris;
use crate::predict::types::{ContactWindow, StationPasses};
use crate::predict::visibility::{
    elevation_deg, is_visible, topocentric_elevation_deg, ElevationModel, VisibilityPolicy,
    DEFAULT_MAX_RANGE_RADII,
};
use crate::stations::GroundStation;

/// Sampling step. Passes shorter than one step can be missed entirely, and the
/// reported start/end carry up to one step of jitter; a smaller step trades
/// runtime for resolution.
pub const DEFAULT_STEP: Duration = Duration::seconds(60);
/// Windows must last strictly longer than this to be reported.
pub const DEFAULT_MIN_PASS_DURATION: Duration = Duration::seconds(30);
pub const DEFAULT_MIN_ELEVATION_DEG: f64 = 10.0;
pub const DEFAULT_SCENE_RADIUS: f64 = 1.0;
pub const DEFAULT_HORIZON_HOURS: f64 = 24.0;
/// Longest horizon a single request may sweep (two weeks).
pub const DEFAULT_MAX_HORIZON_HOURS: f64 = 14.0 * 24.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PassPolicy {
    pub step: Duration,
    pub min_pass_duration: Duration,
    pub min_elevation_deg: f64,
    pub scene_radius: f64,
    pub max_range_radii: f64,
    pub model: ElevationModel,
    pub max_horizon_hours: f64,
}

impl Default for PassPolicy {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            min_pass_duration: DEFAULT_MIN_PASS_DURATION,
            min_elevation_deg: DEFAULT_MIN_ELEVATION_DEG,
            scene_radius: DEFAULT_SCENE_RADIUS,
            max_range_radii: DEFAULT_MAX_RANGE_RADII,
            model: ElevationModel::Spherical,
            max_horizon_hours: DEFAULT_MAX_HORIZON_HOURS,
        }
    }
}

impl PassPolicy {
    fn visibility(&self) -> VisibilityPolicy {
        VisibilityPolicy {
            min_elevation_deg: self.min_elevation_deg,
            max_range_radii: self.max_range_radii,
        }
    }
}

struct OpenWindow {
    start: DateTime<Utc>,
    max_elevation: f64,
}

/// Turns a stream of visibility samples into contact windows.
///
/// A sample carries `Some(elevation)` when the satellite is visible and `None`
/// otherwise. A rising edge opens a window, a falling edge closes it at the first
/// invisible sample, and a window still open when the stream ends is closed at the
/// last sample. Reported maxima are rounded to 2 decimals but never below
/// `min_elevation`.
pub struct WindowDetector {
    min_duration: Duration,
    min_elevation: f64,
    open: Option<OpenWindow>,
    last_instant: Option<DateTime<Utc>>,
    windows: Vec<ContactWindow>,
}

impl WindowDetector {
    pub fn new(min_duration: Duration, min_elevation: f64) -> Self {
        Self {
            min_duration,
            min_elevation,
            open: None,
            last_instant: None,
            windows: Vec::new(),
        }
    }

    pub fn push(&mut self, instant: DateTime<Utc>, elevation: Option<f64>) {
        self.last_instant = Some(instant);
        match (elevation, self.open.as_mut()) {
            (Some(el), None) => {
                self.open = Some(OpenWindow {
                    start: instant,
                    max_elevation: el,
                });
            }
            (Some(el), Some(window)) => {
                if el > window.max_elevation {
                    window.max_elevation = el;
                }
            }
            (None, Some(_)) => self.close(instant),
            (None, None) => {}
        }
    }

    pub fn finish(mut self) -> Vec<ContactWindow> {
        if let Some(end) = self.last_instant {
            self.close(end);
        }
        self.windows
    }

    fn close(&mut self, end: DateTime<Utc>) {
        if let Some(window) = self.open.take() {
            if end - window.start > self.min_duration {
                let max_elevation = round2(window.max_elevation).max(self.min_elevation);
                self.windows
                    .push(ContactWindow::new(window.start, end, max_elevation));
            }
        }
    }
}

/// Passes of one satellite over every station, from `start` for `horizon_hours`.
/// Stations without a qualifying window are left out of the result.
pub fn predict_passes<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    stations: &[GroundStation],
    start: DateTime<Utc>,
    horizon_hours: f64,
    policy: &PassPolicy,
) -> Result<Vec<StationPasses>, PredictError> {
    predict_passes_until(ephemeris, stations, start, horizon_hours, policy, &AbortFlag::new())
}

/// Like [`predict_passes`], checking `abort` before each station.
pub fn predict_passes_until<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    stations: &[GroundStation],
    start: DateTime<Utc>,
    horizon_hours: f64,
    policy: &PassPolicy,
    abort: &AbortFlag,
) -> Result<Vec<StationPasses>, PredictError> {
    let end = horizon_end(start, horizon_hours, policy.max_horizon_hours)?;
    if policy.step <= Duration::zero() {
        return Err(PredictError::InvalidStep);
    }

    let track = sample_track(ephemeris, start, end, policy.step);

    let mut result = Vec::new();
    for station in stations {
        if abort.is_aborted() {
            return Err(PredictError::Aborted);
        }

        let passes = station_windows(&track, station, policy);
        if !passes.is_empty() {
            result.push(StationPasses {
                ground_station_id: station.id.clone(),
                ground_station_name: station.name.clone(),
                passes,
            });
        }
    }

    Ok(result)
}

/// Ids of the stations with at least one pass in the horizon.
pub fn accessible_ground_stations<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    stations: &[GroundStation],
    start: DateTime<Utc>,
    horizon_hours: f64,
    policy: &PassPolicy,
) -> Result<Vec<String>, PredictError> {
    Ok(predict_passes(ephemeris, stations, start, horizon_hours, policy)?
        .into_iter()
        .map(|p| p.ground_station_id)
        .collect())
}

fn horizon_end(
    start: DateTime<Utc>,
    horizon_hours: f64,
    max_hours: f64,
) -> Result<DateTime<Utc>, PredictError> {
    if !horizon_hours.is_finite() || horizon_hours < 0.0 {
        return Err(PredictError::InvalidHorizon(horizon_hours));
    }
    if horizon_hours > max_hours {
        return Err(PredictError::HorizonTooLong {
            hours: horizon_hours,
            max: max_hours,
        });
    }
    let millis = (horizon_hours * 3_600_000.0).round() as i64;
    Duration::try_milliseconds(millis)
        .and_then(|span| start.checked_add_signed(span))
        .ok_or(PredictError::InvalidHorizon(horizon_hours))
}

/// Position at every step; failed propagation leaves a gap that reads as
/// "not visible".
fn sample_track<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
) -> Vec<(DateTime<Utc>, Option<GeodeticPosition>)> {
    let mut samples = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let position = match ephemeris.geodetic_at(cursor) {
            Ok(p) => Some(p),
            Err(e) => {
                log::trace!("No position at {}: {}", cursor, e);
                None
            }
        };
        samples.push((cursor, position));
        cursor += step;
    }
    samples
}

fn station_windows(
    track: &[(DateTime<Utc>, Option<GeodeticPosition>)],
    station: &GroundStation,
    policy: &PassPolicy,
) -> Vec<ContactWindow> {
    let gs = station.scene_position(policy.scene_radius);
    let mut detector = WindowDetector::new(policy.min_pass_duration, policy.min_elevation_deg);
    for (instant, position) in track {
        let elevation = position
            .as_ref()
            .and_then(|p| visible_elevation(p, station, &gs, policy));
        detector.push(*instant, elevation);
    }
    detector.finish()
}

/// Elevation of a visible satellite under `policy`'s model, `None` when hidden.
pub(crate) fn visible_elevation(
    position: &GeodeticPosition,
    station: &GroundStation,
    gs: &ScenePoint,
    policy: &PassPolicy,
) -> Option<f64> {
    match policy.model {
        ElevationModel::Spherical => {
            let sat = satellite_scene_point(position, policy.scene_radius);
            is_visible(&sat, gs, &policy.visibility()).then(|| elevation_deg(&sat, gs))
        }
        ElevationModel::Topocentric => {
            let el = topocentric_elevation_deg(position, station.latitude_deg, station.longitude_deg);
            (el >= policy.min_elevation_deg).then_some(el)
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
