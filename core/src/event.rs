//! Event trait and wire format for event sourcing.
//!
//! Events are immutable facts. They are serialized with `bincode` for
//! storage and transport; the event type string (e.g. `"BookingOpened.v1"`)
//! travels alongside the bytes so consumers can route and version schemas.

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Errors from event serialization.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be persisted and replayed to reconstruct state.
///
/// `event_type()` must return a stable identifier with a version suffix
/// (`"BookingOpened.v1"`) so schemas can evolve without breaking old
/// streams.
///
/// # Example
///
/// ```
/// use marquee_core::event::Event;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// enum LedgerEvent {
///     BookingOpened { booking_id: String },
/// }
///
/// impl Event for LedgerEvent {
///     fn event_type(&self) -> &'static str {
///         match self {
///             LedgerEvent::BookingOpened { .. } => "BookingOpened.v1",
///         }
///     }
/// }
/// ```
pub trait Event: Send + Sync + 'static {
    /// Stable, versioned identifier for this event variant.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if encoding fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes do not
    /// decode into this type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for storage or publication.
///
/// Metadata is free-form JSON; common fields are `correlation_id` and
/// `user_id`.
#[derive(Clone, Debug)]
pub struct SerializedEvent {
    /// Versioned event type identifier.
    pub event_type: String,
    /// The bincode-encoded event payload.
    pub data: Vec<u8>,
    /// Optional JSON metadata.
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a serialized event from raw parts.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Serialize an [`Event`] into its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if encoding fails.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.event_type, self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum TestEvent {
        Opened { id: String },
        Closed { id: String, reason: String },
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened { .. } => "TestEvent.Opened.v1",
                TestEvent::Closed { .. } => "TestEvent.Closed.v1",
            }
        }
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn serialization_round_trip() {
        let event = TestEvent::Closed {
            id: "e-1".to_string(),
            reason: "done".to_string(),
        };

        let bytes = event.to_bytes().expect("serialize");
        let back = TestEvent::from_bytes(&bytes).expect("deserialize");
        assert_eq!(event, back);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn from_event_carries_type_and_metadata() {
        let event = TestEvent::Opened { id: "e-1".to_string() };
        let metadata = serde_json::json!({ "correlation_id": "c-1" });

        let serialized = SerializedEvent::from_event(&event, Some(metadata.clone())).expect("serialize");
        assert_eq!(serialized.event_type, "TestEvent.Opened.v1");
        assert!(!serialized.data.is_empty());
        assert_eq!(serialized.metadata, Some(metadata));
    }
}
