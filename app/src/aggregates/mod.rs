//! Aggregates of the booking platform.
//!
//! [`booking`] is the event-sourced ledger aggregate (the reservation
//! coordinator); [`seat_map`] is the seat-inventory state it owns.

pub mod booking;
pub mod seat_map;

pub use booking::{BookingAction, BookingEnvironment, BookingError, BookingReducer};
pub use seat_map::{SeatMap, SeatMapError};
