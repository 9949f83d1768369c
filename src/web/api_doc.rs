use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::{bookings, catalog, predict, stations};

#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::status,
        catalog::list_satellites,
        predict::satellite_info,
        predict::satellite_position,
        predict::satellite_passes,
        predict::accessible_stations,
        predict::catalog_passes,
        stations::list_stations,
        stations::register_station,
        stations::get_station,
        stations::remove_station,
        stations::toggle_station,
        bookings::submit_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::approve_booking,
        bookings::cancel_booking,
        bookings::complete_booking,
    ),
    components(
        schemas(
            super::api::error::ErrorResponse,
            catalog::CatalogStatusResponse,
            predict::PositionResponse,
            predict::PositionFrame,
            predict::StationMode,
            crate::catalog::Availability,
            crate::catalog::CatalogEntry,
            crate::catalog::CategoryCount,
            crate::predict::tle::OrbitalElementSet,
            crate::predict::coords::GeodeticPosition,
            crate::predict::coords::ScenePoint,
            crate::predict::ContactWindow,
            crate::predict::StationPasses,
            crate::predict::SatelliteInfo,
            crate::predict::SatellitePasses,
            crate::stations::GroundStation,
            crate::stations::StationStatus,
            crate::stations::StationRequest,
            crate::bookings::Booking,
            crate::bookings::BookingRequest,
            crate::bookings::BookingStatus,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Sat-O-View API",
        description = "Satellite positions, pass prediction, ground stations and bookings",
        version = "0.1.0"
    ),
    tags(
        (name = "catalog", description = "Satellite catalog"),
        (name = "predict", description = "Positions and pass prediction"),
        (name = "stations", description = "Ground station registry"),
        (name = "bookings", description = "Contact bookings")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
