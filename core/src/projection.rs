//! Read-model projections.
//!
//! A projection folds domain events into a query-optimized view. Projections
//! are updated from the event bus after events are persisted, so they are
//! eventually consistent with the write side and must tolerate duplicate
//! delivery.

use thiserror::Error;

/// Errors from projection updates.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// The event could not be applied to the view.
    #[error("Failed to apply event: {0}")]
    ApplyFailed(String),
}

/// A read model fed by domain events.
pub trait Projection {
    /// The event type this projection consumes.
    type Event;

    /// Fold one event into the view. Must be idempotent per event identity.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::ApplyFailed`] if the event cannot be
    /// applied; the caller logs and continues.
    fn handle_event(&mut self, event: &Self::Event) -> Result<(), ProjectionError>;

    /// Discard the view so it can be rebuilt from scratch.
    fn reset(&mut self);
}
