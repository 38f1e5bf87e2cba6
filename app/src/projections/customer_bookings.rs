//! Per-customer booking history projection.
//!
//! Folds ledger events into compact per-user summaries so the "my bookings"
//! listing never touches the write side. Updated from the event bus, so it
//! is eventually consistent and tolerates duplicate delivery (every fold is
//! a plain overwrite keyed by booking id).

use crate::aggregates::booking::BookingAction;
use crate::events::PlatformEvent;
use crate::types::{BookingId, Money, PaymentStatus, ShowId, UserId};
use chrono::{DateTime, Utc};
use marquee_core::projection::{Projection, ProjectionError};
use serde::Serialize;
use std::collections::HashMap;

/// Compact view of one booking for history listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSummary {
    /// Booking id.
    pub id: BookingId,
    /// The show booked.
    pub show: ShowId,
    /// Number of seats.
    pub seats: usize,
    /// Total billed.
    pub total_amount: Money,
    /// Current payment state.
    pub payment_status: PaymentStatus,
    /// When the booking was placed.
    pub booking_date: DateTime<Utc>,
}

/// In-memory customer booking history.
#[derive(Debug, Default)]
pub struct CustomerBookingsProjection {
    by_user: HashMap<UserId, Vec<BookingSummary>>,
    owners: HashMap<BookingId, UserId>,
}

impl CustomerBookingsProjection {
    /// Creates an empty projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A user's bookings, newest first.
    #[must_use]
    pub fn bookings_for(&self, user: &UserId) -> Vec<BookingSummary> {
        let mut bookings = self.by_user.get(user).cloned().unwrap_or_default();
        bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        bookings
    }

    fn set_status(&mut self, booking_id: &BookingId, status: PaymentStatus) {
        let Some(user) = self.owners.get(booking_id) else {
            return;
        };
        if let Some(bookings) = self.by_user.get_mut(user) {
            for booking in bookings.iter_mut().filter(|b| b.id == *booking_id) {
                booking.payment_status = status;
            }
        }
    }
}

impl Projection for CustomerBookingsProjection {
    type Event = PlatformEvent;

    fn handle_event(&mut self, event: &Self::Event) -> Result<(), ProjectionError> {
        let PlatformEvent::Booking(action) = event;
        match action {
            BookingAction::BookingOpened {
                booking_id,
                user_id,
                show_id,
                seats,
                total_amount,
                opened_at,
                ..
            } => {
                let summary = BookingSummary {
                    id: *booking_id,
                    show: *show_id,
                    seats: seats.len(),
                    total_amount: *total_amount,
                    payment_status: PaymentStatus::Pending,
                    booking_date: *opened_at,
                };
                self.owners.insert(*booking_id, *user_id);
                let bookings = self.by_user.entry(*user_id).or_default();
                // Duplicate delivery: replace, never double-insert.
                bookings.retain(|b| b.id != *booking_id);
                bookings.push(summary);
            }
            BookingAction::PaymentCaptured { booking_id, .. } => {
                self.set_status(booking_id, PaymentStatus::Completed);
            }
            BookingAction::HoldExpired { booking_id, .. }
            | BookingAction::ChargeIntentFailed { booking_id, .. } => {
                self.set_status(booking_id, PaymentStatus::Failed);
            }
            BookingAction::CancellationStarted { booking_id, .. } => {
                self.set_status(booking_id, PaymentStatus::CancelPending);
            }
            BookingAction::RefundSucceeded { booking_id, .. } => {
                self.set_status(booking_id, PaymentStatus::Refunded);
            }
            BookingAction::RefundFailed { booking_id, .. } => {
                self.set_status(booking_id, PaymentStatus::Completed);
            }
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.by_user.clear();
        self.owners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SeatCategory, SeatKey, SeatSnapshot};

    fn opened(user: UserId, booking_id: BookingId) -> PlatformEvent {
        PlatformEvent::Booking(BookingAction::BookingOpened {
            booking_id,
            user_id: user,
            show_id: ShowId::new(),
            seats: vec![SeatSnapshot {
                key: SeatKey::new("A", 1),
                category: SeatCategory::Normal,
                price: Money::from_major(90),
            }],
            total_amount: Money::from_major(90),
            hold_expires_at: Utc::now(),
            opened_at: Utc::now(),
        })
    }

    #[test]
    fn tracks_status_through_the_lifecycle() {
        let mut projection = CustomerBookingsProjection::new();
        let user = UserId::new();
        let booking_id = BookingId::new();

        projection.handle_event(&opened(user, booking_id)).ok();
        assert_eq!(
            projection.bookings_for(&user)[0].payment_status,
            PaymentStatus::Pending
        );

        projection
            .handle_event(&PlatformEvent::Booking(BookingAction::PaymentCaptured {
                booking_id,
                payment_id: "pay_1".to_string(),
                tickets: Vec::new(),
                captured_at: Utc::now(),
            }))
            .ok();
        assert_eq!(
            projection.bookings_for(&user)[0].payment_status,
            PaymentStatus::Completed
        );
    }

    #[test]
    fn duplicate_delivery_does_not_double_count() {
        let mut projection = CustomerBookingsProjection::new();
        let user = UserId::new();
        let booking_id = BookingId::new();
        let event = opened(user, booking_id);

        projection.handle_event(&event).ok();
        projection.handle_event(&event).ok();
        assert_eq!(projection.bookings_for(&user).len(), 1);
    }

    #[test]
    fn reset_clears_the_view() {
        let mut projection = CustomerBookingsProjection::new();
        let user = UserId::new();
        projection.handle_event(&opened(user, BookingId::new())).ok();
        projection.reset();
        assert!(projection.bookings_for(&user).is_empty());
    }
}
