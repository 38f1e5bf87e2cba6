//! # Marquee Web
//!
//! Shared web-layer types for the Marquee HTTP API: the [`error::AppError`]
//! envelope that maps domain failures onto HTTP responses, and request
//! extractors used across handlers.

pub mod error;
pub mod extractors;

pub use error::AppError;
pub use extractors::CorrelationId;
