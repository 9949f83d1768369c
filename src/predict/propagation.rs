use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sgp4::{Constants, Elements};

use crate::predict::coords::{eci_to_geodetic, GeodeticPosition};
use crate::predict::error::PropagationError;
use crate::predict::tle::OrbitalElementSet;

/// Position/velocity of one satellite at one instant, in the inertial (TEME) frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PropagatedState {
    pub instant: DateTime<Utc>,
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

impl PropagatedState {
    pub fn speed_km_s(&self) -> f64 {
        let v = self.velocity_km_s;
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }
}

/// Anything that can tell where a satellite is over the Earth at a given instant.
pub trait Ephemeris {
    fn geodetic_at(&self, instant: DateTime<Utc>) -> Result<GeodeticPosition, PropagationError>;
}

/// Stable identity of a compiled orbit: catalog number plus element epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrbitKey {
    pub catalog_number: String,
    pub epoch: String,
}

impl OrbitKey {
    pub fn of(set: &OrbitalElementSet) -> Self {
        Self {
            catalog_number: set.catalog_number.clone(),
            epoch: set.epoch.clone(),
        }
    }
}

/// An element set run through SGP4 initialisation, ready for cheap evaluation.
pub struct CompiledOrbit {
    source: OrbitalElementSet,
    elements: Elements,
    constants: Constants,
}

impl fmt::Debug for CompiledOrbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledOrbit")
            .field("name", &self.source.name)
            .field("catalog_number", &self.source.catalog_number)
            .field("epoch", &self.source.epoch)
            .finish()
    }
}

impl CompiledOrbit {
    pub fn compile(set: &OrbitalElementSet) -> Result<Self, PropagationError> {
        let elements = Elements::from_tle(
            Some(set.name.clone()),
            set.line1.as_bytes(),
            set.line2.as_bytes(),
        )
        .map_err(|e| PropagationError::Elements(e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PropagationError::Elements(e.to_string()))?;

        Ok(Self {
            source: set.clone(),
            elements,
            constants,
        })
    }

    pub fn source(&self) -> &OrbitalElementSet {
        &self.source
    }

    pub fn propagate(&self, instant: DateTime<Utc>) -> Result<PropagatedState, PropagationError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&instant.naive_utc())
            .map_err(|e| PropagationError::Epoch(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PropagationError::Model(e.to_string()))?;

        let finite = prediction
            .position
            .iter()
            .chain(prediction.velocity.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(PropagationError::NonFinite);
        }

        Ok(PropagatedState {
            instant,
            position_km: prediction.position,
            velocity_km_s: prediction.velocity,
        })
    }
}

impl Ephemeris for CompiledOrbit {
    fn geodetic_at(&self, instant: DateTime<Utc>) -> Result<GeodeticPosition, PropagationError> {
        let state = self.propagate(instant)?;
        Ok(eci_to_geodetic(state.position_km, instant))
    }
}

/// Uncached one-shot propagation. Prefer [`OrbitCache`] when evaluating the same
/// element set repeatedly.
pub fn propagate(
    set: &OrbitalElementSet,
    instant: DateTime<Utc>,
) -> Result<PropagatedState, PropagationError> {
    CompiledOrbit::compile(set)?.propagate(instant)
}

/// Compiled orbits keyed by [`OrbitKey`]. Each catalog owns one, so a refresh
/// drops the whole arena with the old catalog.
#[derive(Debug, Default)]
pub struct OrbitCache {
    orbits: HashMap<OrbitKey, Arc<CompiledOrbit>>,
}

impl OrbitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached orbit for `set`, compiling it if absent or if the cached
    /// entry was built from different element lines.
    pub fn get_or_compile(
        &mut self,
        set: &OrbitalElementSet,
    ) -> Result<Arc<CompiledOrbit>, PropagationError> {
        let key = OrbitKey::of(set);
        if let Some(orbit) = self.orbits.get(&key) {
            if orbit.source == *set {
                return Ok(orbit.clone());
            }
        }

        let orbit = Arc::new(CompiledOrbit::compile(set)?);
        self.orbits.insert(key, orbit.clone());
        Ok(orbit)
    }

    pub fn get(&self, key: &OrbitKey) -> Option<Arc<CompiledOrbit>> {
        self.orbits.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.orbits.len()
    }
}
