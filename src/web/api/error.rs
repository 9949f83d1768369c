use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    bookings::BookingError, predict::PredictError, stations::StationError,
    web::auth::AuthError,
};

pub enum ApiError {
    Auth(AuthError),
    Validation(String),
    NotFound(&'static str),
    Conflict(String),
    /// The catalog has not finished its first load.
    Unavailable,
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl From<StationError> for ApiError {
    fn from(e: StationError) -> Self {
        match e {
            StationError::Validation(msg) => ApiError::Validation(msg),
            StationError::NotFound(_) => ApiError::NotFound("station_not_found"),
            StationError::BuiltIn(_) => ApiError::Conflict(e.to_string()),
            StationError::Io(_) | StationError::Yaml(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::Validation(msg) => ApiError::Validation(msg),
            BookingError::NotFound(_) => ApiError::NotFound("booking_not_found"),
            BookingError::CapacityExceeded(_) | BookingError::InvalidTransition { .. } => {
                ApiError::Conflict(e.to_string())
            }
            BookingError::Io(_) | BookingError::Yaml(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::InvalidHorizon(_)
            | PredictError::HorizonTooLong { .. }
            | PredictError::InvalidStep => {
                ApiError::Validation(e.to_string())
            }
            PredictError::Aborted | PredictError::Propagation(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => e.into_response(),
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("validation_failed", &msg)),
            )
                .into_response(),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(what))).into_response()
            }
            ApiError::Conflict(msg) => (
                StatusCode::CONFLICT,
                Json(ErrorResponse::with_message("conflict", &msg)),
            )
                .into_response(),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("catalog_loading")),
            )
                .into_response(),
            ApiError::Internal(msg) => {
                log::error!("Request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::with_message("internal_error", &msg)),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: None,
        }
    }

    pub fn with_message(error: &str, message: &str) -> Self {
        ErrorResponse {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}
