//! # Marquee
//!
//! Backend of a movie-ticket booking platform: catalog browsing (movies,
//! theaters, shows), seat-based booking with payment capture, and
//! role-gated partner/admin management.
//!
//! The booking core is one event-sourced aggregate
//! ([`aggregates::booking`]) owning every show's seat map and every booking
//! record. Its reducer runs serially in the store runtime, which makes seat
//! reservation an atomic all-or-nothing operation: two concurrent requests
//! for overlapping seats cannot both succeed. Payments and notifications
//! are injected collaborators behind [`payments::PaymentGateway`] and
//! [`notifications::Notifier`].

pub mod aggregates;
pub mod api;
pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod events;
pub mod notifications;
pub mod payments;
pub mod projections;
pub mod server;
pub mod tickets;
pub mod types;

pub use app::{LedgerStore, Platform, PlatformError};
pub use config::Config;
pub use server::{AppState, build_router};
