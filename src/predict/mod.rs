pub mod coords;
mod error;
mod export;
mod pass_finder;
mod propagation;
mod query;
pub mod tle;
mod types;
pub mod visibility;

pub use error::PredictError;
pub use export::{passes_to_csv_string, write_passes_csv};
pub use pass_finder::{
    PassPolicy, DEFAULT_HORIZON_HOURS, DEFAULT_MAX_HORIZON_HOURS, DEFAULT_MIN_ELEVATION_DEG,
};
pub use propagation::{propagate, CompiledOrbit, OrbitCache, OrbitKey};
pub use query::{
    calculate_inertial_position, calculate_satellite_position, get_accessible_ground_stations,
    get_nearby_ground_stations, get_satellite_info, get_visible_ground_stations,
    predict_catalog_passes, predict_satellite_passes, SatellitePasses, DEFAULT_NEARBY_RANGE_KM,
};
pub use types::{ContactWindow, SatelliteInfo, StationPasses};
