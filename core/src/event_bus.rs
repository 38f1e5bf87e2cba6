//! Event bus abstraction for cross-component distribution.
//!
//! Events are persisted to the event store first (source of truth), then
//! published here for projections and observers. Delivery is at-least-once;
//! subscribers must tolerate duplicates.
//!
//! Implementations: `BroadcastEventBus` (`marquee-runtime`, in-process) and
//! `InMemoryEventBus` (`marquee-testing`).

use crate::event::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Publishing to a topic failed.
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed.
        topic: String,
        /// Why it failed.
        reason: String,
    },

    /// Subscription could not be established.
    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics requested.
        topics: Vec<String>,
        /// Why it failed.
        reason: String,
    },

    /// Anything else.
    #[error("Event bus error: {0}")]
    Other(String),
}

/// Stream of events delivered to a subscriber.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SerializedEvent, EventBusError>> + Send>>;

/// Publish/subscribe transport for serialized events.
///
/// Returns boxed futures instead of `async fn` so the trait stays
/// dyn-compatible (`Arc<dyn EventBus>` is captured inside effects).
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if delivery fails.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the subscription
    /// cannot be established.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}
