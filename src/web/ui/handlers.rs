use axum::{extract::State, response::IntoResponse};

use crate::bookings::BookingStatus;
use crate::web::state::AppState;

use super::templates::DashboardTemplate;

pub async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let (availability, catalog) = {
        let catalog_state = state.catalog.read().await;
        (catalog_state.availability(), catalog_state.catalog())
    };
    let stations = state.stations.read().await.all();

    let bookings = {
        let store = state.bookings.lock().await;
        let mut open = Vec::new();
        for status in [BookingStatus::Pending, BookingStatus::Active] {
            match store.list(status) {
                Ok(list) => open.extend(list),
                Err(e) => log::warn!("Failed to list {} bookings: {}", status, e),
            }
        }
        open.sort_by_key(|b| b.start);
        open
    };

    DashboardTemplate {
        availability: availability.to_string(),
        satellite_count: catalog.as_ref().map_or(0, |c| c.len()),
        loaded_at: catalog
            .as_ref()
            .map(|c| c.loaded_at().format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string()),
        failed_sources: catalog
            .as_ref()
            .map(|c| c.failed_sources().to_vec())
            .unwrap_or_default(),
        categories: catalog.as_ref().map(|c| c.categories()).unwrap_or_default(),
        stations,
        bookings,
    }
}
