use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::bookings::BookingStore;
use crate::catalog::{build_client, CatalogRefresher, CatalogState, RefreshParams};
use crate::stations::{StationError, StationRegistry};

use super::api::bookings as booking_handlers;
use super::api::catalog as catalog_handlers;
use super::api::predict as predict_handlers;
use super::api::stations as station_handlers;
use super::api_doc::ApiDoc;
use super::state::AppState;
use super::config::{Config, ConfigError};
use super::ui::handlers as ui_handlers;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Station registry error: {0}")]
    Stations(#[from] StationError),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // UI routes
        .route("/", get(ui_handlers::dashboard))
        // Catalog API endpoints
        .route("/api/catalog", get(catalog_handlers::status))
        .route(
            "/api/catalog/satellites",
            get(catalog_handlers::list_satellites),
        )
        // Predict API endpoints
        .route(
            "/api/satellites/{norad_id}",
            get(predict_handlers::satellite_info),
        )
        .route(
            "/api/satellites/{norad_id}/position",
            get(predict_handlers::satellite_position),
        )
        .route(
            "/api/satellites/{norad_id}/passes",
            get(predict_handlers::satellite_passes),
        )
        .route(
            "/api/satellites/{norad_id}/stations",
            get(predict_handlers::accessible_stations),
        )
        .route("/api/passes", get(predict_handlers::catalog_passes))
        // Station API endpoints
        .route(
            "/api/stations",
            get(station_handlers::list_stations).post(station_handlers::register_station),
        )
        .route(
            "/api/stations/{id}",
            get(station_handlers::get_station).delete(station_handlers::remove_station),
        )
        .route(
            "/api/stations/{id}/toggle",
            post(station_handlers::toggle_station),
        )
        // Booking API endpoints
        .route(
            "/api/bookings",
            get(booking_handlers::list_bookings).post(booking_handlers::submit_booking),
        )
        .route("/api/bookings/{id}", get(booking_handlers::get_booking))
        .route(
            "/api/bookings/{id}/approve",
            post(booking_handlers::approve_booking),
        )
        .route(
            "/api/bookings/{id}/cancel",
            post(booking_handlers::cancel_booking),
        )
        .route(
            "/api/bookings/{id}/complete",
            post(booking_handlers::complete_booking),
        )
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let bind_addr = config.web.bind.clone();
    let policy = config.prediction.policy()?;
    let stations = StationRegistry::open(config.storage.stations_file())?;
    let bookings = BookingStore::new(config.storage.bookings_folder());

    let client = build_client(config.catalog.fetch_timeout()?)?;
    let catalog = Arc::new(RwLock::new(CatalogState::Loading));
    let mut refresher = CatalogRefresher::start(
        RefreshParams {
            sources: config.catalog.sources.clone(),
            interval: config.catalog.refresh_interval()?,
        },
        catalog.clone(),
        client,
    );

    let state = AppState {
        config: Arc::new(config),
        policy: Arc::new(policy),
        catalog,
        stations: Arc::new(RwLock::new(stations)),
        bookings: Arc::new(Mutex::new(bookings)),
    };

    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutdown requested");
        })
        .await;

    refresher.stop().await;
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogEntry};
    use crate::predict::tle::tests::iss;
    use crate::predict::PassPolicy;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    const CONFIG: &str = r#"
catalog:
  sources: []
storage:
  data_folder: /nonexistent
approval:
  mode: manual
api_keys:
  - key: viewer
    name: viewer
    permissions: [view_predictions]
  - key: ops
    name: ops
    permissions: [view_predictions, manage_stations, submit_booking, list_bookings, approve_booking]
  - key: guest
    name: guest
    permissions: [submit_booking, list_bookings]
"#;

    fn state(dir: &std::path::Path, catalog: CatalogState) -> AppState {
        AppState {
            config: Arc::new(Config::from_str(CONFIG).unwrap()),
            policy: Arc::new(PassPolicy::default()),
            catalog: Arc::new(RwLock::new(catalog)),
            stations: Arc::new(RwLock::new(
                StationRegistry::open(dir.join("custom_stations.yaml")).unwrap(),
            )),
            bookings: Arc::new(Mutex::new(BookingStore::new(dir.join("bookings")))),
        }
    }

    fn get(uri: &str, key: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {}", key))
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, key: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_key_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), CatalogState::Loading));
        let response = app
            .oneshot(Request::builder().uri("/api/catalog").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn loading_catalog_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), CatalogState::Loading));

        let response = app.clone().oneshot(get("/api/catalog", "viewer")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["availability"], "loading");

        let response = app
            .oneshot(get("/api/satellites/25544/position", "viewer"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn position_and_csv_passes_for_loaded_satellite() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::new(vec![CatalogEntry {
            elements: iss(),
            category: "stations".into(),
        }]);
        let app = router(state(dir.path(), CatalogState::Ready(Arc::new(catalog))));

        let response = app
            .clone()
            .oneshot(get(
                "/api/satellites/25544/position?at=2008-09-20T12:30:00Z",
                "viewer",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["name"], "ISS (ZARYA)");

        let response = app
            .clone()
            .oneshot(get(
                "/api/satellites/25544/position?at=2008-09-20T12:30:00Z&frame=inertial",
                "viewer",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["frame"], "inertial");

        let response = app
            .clone()
            .oneshot(get(
                "/api/satellites/25544/stations?mode=visible&at=2008-09-20T12:30:00Z",
                "viewer",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json(response).await.is_array());

        let response = app
            .clone()
            .oneshot(get(
                "/api/satellites/25544/stations?mode=nearby&range_km=-5",
                "viewer",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(get("/api/satellites/25544/passes?hours=1000000", "viewer"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(get(
                "/api/satellites/25544/passes?start=2008-09-20T12:30:00Z&hours=6&format=csv",
                "viewer",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Ground Station,Start Time"));

        let response = app
            .oneshot(get("/api/satellites/99999", "viewer"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn station_and_booking_flow() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(dir.path(), CatalogState::Loading));

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/stations",
                "viewer",
                serde_json::json!({"name": "Roof", "latitude_deg": 48.1, "longitude_deg": 11.6}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/stations",
                "ops",
                serde_json::json!({"name": "Bad", "latitude_deg": 123.0, "longitude_deg": 11.6}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/stations",
                "ops",
                serde_json::json!({"name": "Roof", "latitude_deg": 48.1, "longitude_deg": 11.6}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let station = json(response).await;
        assert_eq!(station["capacity"], 1);
        let station_id = station["id"].as_str().unwrap().to_string();

        let booking = serde_json::json!({
            "satellite": "ISS (ZARYA)",
            "start": "2030-01-01T10:00:00Z",
            "end": "2030-01-01T10:10:00Z",
            "ground_station_ids": [station_id],
            "purpose": "voice relay"
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/bookings", "ops", booking.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = json(response).await;
        assert_eq!(created["status"], "pending");
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json("/api/bookings", "ops", booking))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/bookings/{}/approve", id),
                "ops",
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "active");

        let cancel = format!("/api/bookings/{}/cancel", id);
        let response = app
            .clone()
            .oneshot(post_json(&cancel, "guest", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json(response).await["error"], "forbidden");

        let response = app
            .clone()
            .oneshot(get("/api/bookings/..%2F..%2Fcustom_stations", "ops"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(post_json(&cancel, "ops", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "cancelled");

        let response = app.oneshot(get("/", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
