mod ground_station;
mod registry;

pub use ground_station::{builtin_roster, GroundStation, StationStatus};
pub use registry::{StationError, StationRegistry, StationRequest};
