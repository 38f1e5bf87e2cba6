//! Read models fed from the ledger event stream.

pub mod customer_bookings;

pub use customer_bookings::{BookingSummary, CustomerBookingsProjection};
