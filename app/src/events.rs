//! The platform's persisted event type.
//!
//! Every aggregate event is wrapped in [`PlatformEvent`] before hitting the
//! event store or bus, so consumers decode one enum regardless of source.

use crate::aggregates::booking::BookingAction;
use marquee_core::event::Event;
use serde::{Deserialize, Serialize};

/// Topic booking ledger events are published on.
pub const LEDGER_TOPIC: &str = "ledger-events";

/// Union of all persisted platform events.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PlatformEvent {
    /// An event from the booking ledger aggregate.
    Booking(BookingAction),
}

impl Event for PlatformEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Booking(action) => action.event_type(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::BookingId;
    use chrono::Utc;

    #[test]
    fn wrapped_events_round_trip_through_bincode() {
        let event = PlatformEvent::Booking(BookingAction::HoldExpired {
            booking_id: BookingId::new(),
            expired_at: Utc::now(),
        });

        let bytes = event.to_bytes().unwrap();
        let back = PlatformEvent::from_bytes(&bytes).unwrap();
        assert_eq!(event.event_type(), back.event_type());
        assert_eq!(event.event_type(), "HoldExpired.v1");
    }
}
