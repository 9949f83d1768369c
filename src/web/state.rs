use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::bookings::BookingStore;
use crate::catalog::CatalogState;
use crate::predict::PassPolicy;
use crate::stations::StationRegistry;

use super::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: Arc<PassPolicy>,
    pub catalog: Arc<RwLock<CatalogState>>,
    pub stations: Arc<RwLock<StationRegistry>>,
    /// Serialises submissions so two capacity checks never interleave.
    pub bookings: Arc<Mutex<BookingStore>>,
}
