//! API key authentication. Every `/api` handler takes a [`Caller`], resolved from
//! an `Authorization: Bearer <key>` header against the keys in the config.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashSet;
use thiserror::Error;

use crate::bookings::Booking;

use super::api::error::ErrorResponse;
use super::config::Permission;
use super::state::AppState;

/// The key holder behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    Missing,
    #[error("expected \"Bearer <api key>\"")]
    Malformed,
    #[error("unknown API key")]
    UnknownKey,
    #[error("permission {0} required")]
    Forbidden(Permission),
    #[error("booking {0} was submitted by another key")]
    NotSubmitter(String),
}

impl Caller {
    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if self.permissions.contains(&permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(permission))
        }
    }

    /// Approvers may act on any booking; other submitters only on their own.
    pub fn require_booking_access(&self, booking: &Booking) -> Result<(), AuthError> {
        if self.permissions.contains(&Permission::ApproveBooking) {
            return Ok(());
        }
        self.require(Permission::SubmitBooking)?;
        if booking.requested_by.as_deref() == Some(self.name.as_str()) {
            Ok(())
        } else {
            Err(AuthError::NotSubmitter(booking.id.clone()))
        }
    }
}

fn bearer_key(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !key.is_empty()).then_some(key)
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::Missing | AuthError::Malformed | AuthError::UnknownKey => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden(_) | AuthError::NotSubmitter(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = if status == StatusCode::FORBIDDEN {
            "forbidden"
        } else {
            "unauthorized"
        };
        (
            status,
            Json(ErrorResponse::with_message(code, &self.to_string())),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::Missing)?
            .to_str()
            .map_err(|_| AuthError::Malformed)?;
        let key = bearer_key(value).ok_or(AuthError::Malformed)?;

        let Some(api_key) = state.config.find_api_key(key) else {
            log::warn!("Rejected request to {} with unknown API key", parts.uri.path());
            return Err(AuthError::UnknownKey);
        };

        log::debug!("{} {} as {}", parts.method, parts.uri.path(), api_key.name);
        Ok(Caller {
            name: api_key.name.clone(),
            permissions: api_key.permissions.clone(),
        })
    }
}
