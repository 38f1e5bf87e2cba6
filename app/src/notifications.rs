//! Notification adapter.
//!
//! Delivery is fire-and-forget relative to the booking state machine: a
//! failed notification is logged and never rolls back a payment or seat
//! transition. The trait keeps the delivery channel (email, push, ...) out
//! of the coordinator.

use crate::types::{Booking, UserId};
use async_trait::async_trait;
use std::sync::Mutex;

/// External messaging collaborator.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A booking was paid and its tickets issued.
    async fn booking_confirmed(&self, user: UserId, booking: &Booking);

    /// A completed booking was cancelled and refunded.
    async fn booking_cancelled(&self, user: UserId, booking: &Booking);

    /// A partner's account or theater was approved or rejected.
    async fn account_status(&self, user: UserId, approved: bool);
}

/// Notifier that writes structured log lines instead of sending messages.
///
/// The default in development; production deployments put a real delivery
/// channel behind the same trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, user: UserId, booking: &Booking) {
        tracing::info!(
            %user,
            booking_id = %booking.id,
            tickets = booking.tickets.len(),
            total = booking.total_amount.cents(),
            "Booking confirmed"
        );
    }

    async fn booking_cancelled(&self, user: UserId, booking: &Booking) {
        tracing::info!(
            %user,
            booking_id = %booking.id,
            total = booking.total_amount.cents(),
            "Booking cancelled and refunded"
        );
    }

    async fn account_status(&self, user: UserId, approved: bool) {
        tracing::info!(%user, approved, "Account status notification");
    }
}

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRecord {
    /// `booking_confirmed` was called.
    Confirmed {
        /// Recipient.
        user: UserId,
        /// Number of tickets on the booking.
        tickets: usize,
    },
    /// `booking_cancelled` was called.
    Cancelled {
        /// Recipient.
        user: UserId,
    },
    /// `account_status` was called.
    AccountStatus {
        /// Recipient.
        user: UserId,
        /// Approved or rejected.
        approved: bool,
    },
}

/// Test double that records every notification.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    records: Mutex<Vec<NotificationRecord>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, record: NotificationRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn booking_confirmed(&self, user: UserId, booking: &Booking) {
        self.push(NotificationRecord::Confirmed {
            user,
            tickets: booking.tickets.len(),
        });
    }

    async fn booking_cancelled(&self, user: UserId, _booking: &Booking) {
        self.push(NotificationRecord::Cancelled { user });
    }

    async fn account_status(&self, user: UserId, approved: bool) {
        self.push(NotificationRecord::AccountStatus { user, approved });
    }
}
