//! Booking endpoints.
//!
//! - `POST /api/bookings` - hold seats and open a booking (customer)
//! - `GET  /api/bookings/user` - own bookings, newest first
//! - `GET  /api/bookings/:id` - booking detail (owner only)
//! - `POST /api/bookings/:id/payment` - confirm payment with `{payment_id, signature}`
//! - `POST /api/bookings/:id/cancel` - cancel a completed booking
//!
//! Commands go through the ledger store's request/response loop: the
//! handler sends a correlated command and waits for the matching result
//! action, which is broadcast only after the state transition applied.

use super::booking_error_to_http;
use crate::aggregates::booking::BookingAction;
use crate::auth::middleware::AuthedUser;
use crate::projections::BookingSummary;
use crate::server::state::AppState;
use crate::types::{Booking, BookingId, SeatKey, ShowId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use marquee_web::{CorrelationId, error::AppError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// How long a handler waits for the ledger to answer.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// One seat in a booking request.
#[derive(Debug, Deserialize)]
pub struct SeatKeyRequest {
    /// Row label.
    pub row: String,
    /// Seat number within the row.
    pub number: u32,
}

/// Request body for creating a booking.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Show to book on.
    pub show_id: Uuid,
    /// Seats to hold.
    pub seats: Vec<SeatKeyRequest>,
}

/// Response after creating a booking.
#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    /// The pending booking with its seat/price snapshot.
    pub booking: Booking,
    /// Gateway order reference to pay against.
    pub order_ref: String,
    /// Human-readable hint.
    pub message: String,
}

/// Create a booking: hold seats, open a pending ledger entry, create a
/// charge intent.
///
/// # Errors
///
/// `404` unknown show, `409` seat conflict, `422` invalid seat list,
/// `502` charge-intent failure (the hold is already released).
pub async fn create_booking(
    AuthedUser(session): AuthedUser,
    CorrelationId(correlation_id): CorrelationId,
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    if request.seats.is_empty() {
        return Err(AppError::bad_request("At least one seat is required"));
    }
    if request.seats.len() > 10 {
        return Err(AppError::bad_request("Cannot book more than 10 seats at once"));
    }

    let booking_id = BookingId::new();
    let show_id = ShowId::from_uuid(request.show_id);
    let seat_keys: Vec<SeatKey> = request
        .seats
        .into_iter()
        .map(|s| SeatKey::new(s.row, s.number))
        .collect();

    let result = state
        .ledger
        .send_and_wait_for(
            BookingAction::PlaceBooking {
                correlation_id,
                booking_id,
                user_id: session.user_id,
                show_id,
                seat_keys,
            },
            move |action| match action {
                BookingAction::ChargeIntentOpened { booking_id: b, .. }
                | BookingAction::ChargeIntentFailed { booking_id: b, .. } => *b == booking_id,
                BookingAction::BookingRejected { correlation_id: c, .. } => *c == correlation_id,
                _ => false,
            },
            COMMAND_TIMEOUT,
        )
        .await
        .map_err(|e| AppError::internal(format!("Ledger did not respond: {e}")))?;

    match result {
        BookingAction::ChargeIntentOpened { order_ref, .. } => {
            let booking = state
                .ledger
                .state(|s| s.booking(&booking_id).cloned())
                .await
                .ok_or_else(|| AppError::internal("Booking missing after creation"))?;
            Ok((
                StatusCode::CREATED,
                Json(CreateBookingResponse {
                    booking,
                    order_ref,
                    message: "Booking created. Complete payment before the hold expires."
                        .to_string(),
                }),
            ))
        }
        BookingAction::ChargeIntentFailed { reason, .. } => Err(AppError::upstream(reason)),
        BookingAction::BookingRejected { error, .. } => {
            Err(booking_error_to_http(&error, "Show", show_id))
        }
        _ => Err(AppError::internal("Unexpected ledger response")),
    }
}

/// Response for the booking history listing.
#[derive(Debug, Serialize)]
pub struct ListBookingsResponse {
    /// Summaries, newest first.
    pub bookings: Vec<BookingSummary>,
    /// Total count.
    pub total: usize,
}

/// List the caller's bookings from the history read model.
pub async fn get_user_bookings(
    AuthedUser(session): AuthedUser,
    State(state): State<AppState>,
) -> Json<ListBookingsResponse> {
    let bookings = state.history.read().await.bookings_for(&session.user_id);
    let total = bookings.len();
    Json(ListBookingsResponse { bookings, total })
}

/// Fetch one booking; only its owner may.
///
/// # Errors
///
/// `404` unknown booking, `403` not the owner.
pub async fn get_booking(
    AuthedUser(session): AuthedUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = BookingId::from_uuid(id);
    let booking = state
        .ledger
        .state(|s| s.booking(&booking_id).cloned())
        .await
        .ok_or_else(|| AppError::not_found("Booking", booking_id))?;

    if !booking.owned_by(&session.user_id) {
        return Err(AppError::forbidden("You do not own this booking"));
    }
    Ok(Json(booking))
}

/// Request body for payment confirmation.
#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    /// Gateway payment reference.
    pub payment_id: String,
    /// Keyed-hash signature over `(booking_id, payment_id)`.
    pub signature: String,
}

/// Response after a confirmed payment.
#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The completed booking with issued tickets.
    pub booking: Booking,
}

/// Confirm payment: verify the signature, commit the seats, issue tickets.
///
/// # Errors
///
/// `404`/`403` lookup failures, `400` bad signature or state, `409` the
/// hold expired before payment.
pub async fn confirm_payment(
    AuthedUser(session): AuthedUser,
    CorrelationId(correlation_id): CorrelationId,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    if request.payment_id.trim().is_empty() {
        return Err(AppError::bad_request("payment_id is required"));
    }

    let booking_id = BookingId::from_uuid(id);

    let result = state
        .ledger
        .send_and_wait_for(
            BookingAction::ConfirmPayment {
                correlation_id,
                booking_id,
                requester: session.user_id,
                payment_id: request.payment_id,
                signature: request.signature,
            },
            move |action| match action {
                BookingAction::PaymentConfirmed { correlation_id: c, .. }
                | BookingAction::PaymentRejected { correlation_id: c, .. } => *c == correlation_id,
                _ => false,
            },
            COMMAND_TIMEOUT,
        )
        .await
        .map_err(|e| AppError::internal(format!("Ledger did not respond: {e}")))?;

    match result {
        BookingAction::PaymentConfirmed { .. } => {
            let booking = state
                .ledger
                .state(|s| s.booking(&booking_id).cloned())
                .await
                .ok_or_else(|| AppError::internal("Booking missing after confirmation"))?;
            Ok(Json(ConfirmPaymentResponse {
                message: "Payment successful".to_string(),
                booking,
            }))
        }
        BookingAction::PaymentRejected { error, .. } => {
            Err(booking_error_to_http(&error, "Booking", booking_id))
        }
        _ => Err(AppError::internal("Unexpected ledger response")),
    }
}

/// Response after a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The refunded booking.
    pub booking: Booking,
}

/// Cancel a completed booking: refund first, release seats only after the
/// refund succeeds.
///
/// # Errors
///
/// `404`/`403` lookup failures, `400` not in a cancellable state, `502`
/// refund failure (the booking stays completed; retry later).
pub async fn cancel_booking(
    AuthedUser(session): AuthedUser,
    CorrelationId(correlation_id): CorrelationId,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<CancelBookingResponse>, AppError> {
    let booking_id = BookingId::from_uuid(id);

    let result = state
        .ledger
        .send_and_wait_for(
            BookingAction::CancelBooking {
                correlation_id,
                booking_id,
                requester: session.user_id,
            },
            move |action| match action {
                BookingAction::RefundSucceeded { booking_id: b, .. }
                | BookingAction::RefundFailed { booking_id: b, .. } => *b == booking_id,
                BookingAction::CancellationRejected { correlation_id: c, .. } => {
                    *c == correlation_id
                }
                _ => false,
            },
            COMMAND_TIMEOUT,
        )
        .await
        .map_err(|e| AppError::internal(format!("Ledger did not respond: {e}")))?;

    match result {
        BookingAction::RefundSucceeded { .. } => {
            let booking = state
                .ledger
                .state(|s| s.booking(&booking_id).cloned())
                .await
                .ok_or_else(|| AppError::internal("Booking missing after cancellation"))?;
            Ok(Json(CancelBookingResponse {
                message: "Booking cancelled and refund processed".to_string(),
                booking,
            }))
        }
        BookingAction::RefundFailed { reason, .. } => Err(AppError::upstream(format!(
            "Refund failed, booking remains active: {reason}"
        ))),
        BookingAction::CancellationRejected { error, .. } => {
            Err(booking_error_to_http(&error, "Booking", booking_id))
        }
        _ => Err(AppError::internal("Unexpected ledger response")),
    }
}
