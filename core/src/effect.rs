//! Side-effect descriptions.
//!
//! Reducers never perform I/O; they return [`Effect`] values describing what
//! should happen. The store runtime (`marquee-runtime`) executes them and
//! feeds any resulting actions back into the reducer.

use crate::event::SerializedEvent;
use crate::event_bus::{EventBus, EventBusError};
use crate::event_store::{EventStore, EventStoreError};
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with an operation result, producing an optional
/// follow-up action.
pub type ResultCallback<T, Action> = Box<dyn FnOnce(T) -> Option<Action> + Send>;

/// An event store operation to be executed by the runtime.
pub enum EventStoreOperation<Action> {
    /// Append events to a stream with optional optimistic concurrency.
    AppendEvents {
        /// The store to append to.
        event_store: Arc<dyn EventStore>,
        /// Target stream.
        stream_id: StreamId,
        /// Expected current version, if enforcing optimistic concurrency.
        expected_version: Option<Version>,
        /// Events to append.
        events: Vec<SerializedEvent>,
        /// Called with the new stream version on success.
        on_success: ResultCallback<Version, Action>,
        /// Called with the error on failure.
        on_error: ResultCallback<EventStoreError, Action>,
    },
}

/// An event bus operation to be executed by the runtime.
pub enum EventBusOperation<Action> {
    /// Publish one event to a topic.
    Publish {
        /// The bus to publish on.
        event_bus: Arc<dyn EventBus>,
        /// Target topic.
        topic: String,
        /// The event to publish.
        event: SerializedEvent,
        /// Called on successful publication.
        on_success: ResultCallback<(), Action>,
        /// Called with the error on failure.
        on_error: ResultCallback<EventBusError, Action>,
    },
}

/// A description of a side effect returned from a reducer.
///
/// Effects are values; nothing happens until the runtime executes them.
/// Actions produced by effects are applied to state and then broadcast to
/// observers, closing the feedback loop.
pub enum Effect<Action> {
    /// No-op.
    None,

    /// Run effects concurrently.
    Parallel(Vec<Effect<Action>>),

    /// Run effects in order, waiting for each to complete.
    Sequential(Vec<Effect<Action>>),

    /// Dispatch an action after a delay (timeouts, hold expiry).
    Delay {
        /// How long to wait.
        duration: Duration,
        /// Action to dispatch when the delay elapses.
        action: Box<Action>,
    },

    /// Arbitrary async computation; a `Some` result is fed back as an action.
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

    /// Persist events to the event store.
    EventStore(EventStoreOperation<Action>),

    /// Publish an event on the event bus.
    PublishEvent(EventBusOperation<Action>),
}

impl<Action> Effect<Action> {
    /// Combine effects to run concurrently.
    #[must_use]
    pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Parallel(effects)
    }

    /// Chain effects to run sequentially.
    #[must_use]
    pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Sequential(effects)
    }
}

// Futures and callbacks are not Debug; summarize instead.
impl<Action> std::fmt::Debug for Effect<Action>
where
    Action: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Effect::Sequential(effects) => {
                f.debug_tuple("Effect::Sequential").field(effects).finish()
            }
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            Effect::EventStore(EventStoreOperation::AppendEvents {
                stream_id, events, ..
            }) => f
                .debug_struct("Effect::EventStore::AppendEvents")
                .field("stream_id", stream_id)
                .field("events", &events.len())
                .finish(),
            Effect::PublishEvent(EventBusOperation::Publish { topic, event, .. }) => f
                .debug_struct("Effect::PublishEvent")
                .field("topic", topic)
                .field("event_type", &event.event_type)
                .finish(),
        }
    }
}
