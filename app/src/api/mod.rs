//! REST API handlers.

pub mod admin;
pub mod bookings;
pub mod movies;
pub mod partners;
pub mod shows;
pub mod theaters;

use crate::aggregates::booking::BookingError;
use crate::catalog::CatalogError;
use axum::http::StatusCode;
use marquee_web::error::AppError;
use std::fmt;

/// Map a domain booking error onto the HTTP envelope.
///
/// `resource`/`id` name the entity for not-found responses, which differs
/// per operation (a missing show on create, a missing booking elsewhere).
pub(crate) fn booking_error_to_http(
    error: &BookingError,
    resource: &str,
    id: impl fmt::Display,
) -> AppError {
    match error {
        BookingError::NotFound => AppError::not_found(resource, id),
        BookingError::AccessDenied => AppError::forbidden("You do not own this booking"),
        BookingError::SeatUnavailable { reason } => AppError::conflict(reason.clone()),
        BookingError::InvalidSignature => AppError::bad_request("Invalid payment signature"),
        BookingError::InvalidState { reason } => AppError::bad_request(reason.clone()),
        BookingError::Upstream { reason } => AppError::upstream(reason.clone()),
        BookingError::Validation { reason } => AppError::validation(reason.clone()),
    }
}

/// Map a catalog error onto the HTTP envelope.
pub(crate) fn catalog_error_to_http(error: &CatalogError) -> AppError {
    match error {
        CatalogError::NotFound(what) => AppError::new(
            StatusCode::NOT_FOUND,
            format!("{what} not found"),
            "NOT_FOUND".to_string(),
        ),
        CatalogError::AccessDenied => AppError::forbidden("You do not own this resource"),
        CatalogError::NotApproved => AppError::forbidden("Theater is awaiting approval"),
        CatalogError::Validation(reason) => AppError::validation(reason.clone()),
    }
}
