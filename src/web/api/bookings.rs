use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::bookings::{Booking, BookingRequest, BookingStatus};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::Caller;
use crate::web::config::Permission;
use crate::web::state::AppState;

#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "bookings",
    request_body = BookingRequest,
    responses(
        (status = 201, description = "Booking stored", body = Booking),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions"),
        (status = 409, description = "A station has no free capacity", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn submit_booking(
    State(state): State<AppState>,
    caller: Caller,
    Json(request): Json<BookingRequest>,
) -> ApiResult<impl IntoResponse> {
    caller.require(Permission::SubmitBooking)?;

    let stations = state.stations.read().await.all();
    let store = state.bookings.lock().await;
    let booking = store.submit(
        &request,
        &caller.name,
        &stations,
        state.config.approval.mode,
        &state.config.pricing,
    )?;

    Ok((StatusCode::CREATED, Json(booking)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListBookingsQuery {
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

#[utoipa::path(
    get,
    path = "/api/bookings",
    tag = "bookings",
    params(
        ("status" = Option<String>, Query, description = "Filter by status (pending, active, completed, cancelled)")
    ),
    responses(
        (status = 200, description = "Bookings ordered by start time", body = Vec<Booking>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 403, description = "Insufficient permissions")
    ),
    security(("api_key" = []))
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<ListBookingsQuery>,
) -> ApiResult<Json<Vec<Booking>>> {
    caller.require(Permission::ListBookings)?;

    let store = state.bookings.lock().await;
    let bookings = match query.status {
        Some(status) => store.list(status)?,
        None => store.list_all()?,
    };
    Ok(Json(bookings))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    tag = "bookings",
    params(
        ("id" = String, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn get_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    caller.require(Permission::ListBookings)?;
    Ok(Json(state.bookings.lock().await.get(&id)?))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/approve",
    tag = "bookings",
    params(
        ("id" = String, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking activated", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Not pending, or capacity taken meanwhile", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn approve_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    caller.require(Permission::ApproveBooking)?;

    let stations = state.stations.read().await.all();
    let booking = state.bookings.lock().await.approve(&id, &stations)?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    tag = "bookings",
    params(
        ("id" = String, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = Booking),
        (status = 403, description = "Booking belongs to another key", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking already finished", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    let store = state.bookings.lock().await;
    caller.require_booking_access(&store.get(&id)?)?;
    Ok(Json(store.cancel(&id)?))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/complete",
    tag = "bookings",
    params(
        ("id" = String, Path, description = "Booking ID")
    ),
    responses(
        (status = 200, description = "Booking completed", body = Booking),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking is not active", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    caller.require(Permission::ApproveBooking)?;
    Ok(Json(state.bookings.lock().await.complete(&id)?))
}
