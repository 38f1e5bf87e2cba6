//! Event store abstraction.
//!
//! A deliberately minimal append/load interface over event streams with
//! optimistic concurrency control. Implementations:
//!
//! - `PostgresEventStore` (`marquee-postgres`) for production
//! - `InMemoryEventStore` (`marquee-testing`) for fast, deterministic tests
//!
//! The trait returns boxed futures instead of `async fn` so it stays
//! dyn-compatible (`Arc<dyn EventStore>` is captured inside effects).

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// The stream was not at the expected version; another writer got there
    /// first.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Stream where the conflict occurred.
        stream_id: StreamId,
        /// Version the writer expected.
        expected: Version,
        /// Version actually found.
        actual: Version,
    },

    /// Backing storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Event payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Append-only storage for event streams.
pub trait EventStore: Send + Sync {
    /// Append events to a stream.
    ///
    /// With `expected_version: Some(v)` the append fails with
    /// [`EventStoreError::ConcurrencyConflict`] unless the stream is
    /// currently at `v`; with `None` no version check is performed. Returns
    /// the stream version after the append.
    ///
    /// # Errors
    ///
    /// [`EventStoreError::ConcurrencyConflict`] on a version mismatch,
    /// [`EventStoreError::StorageError`] if the backend fails.
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>>;

    /// Load events from a stream, oldest first.
    ///
    /// `from_version: Some(v)` loads events at versions `>= v`; `None` loads
    /// the whole stream. A missing stream yields an empty vector, not an
    /// error.
    ///
    /// # Errors
    ///
    /// [`EventStoreError::StorageError`] if the backend fails.
    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_conflict_display_names_versions() {
        let error = EventStoreError::ConcurrencyConflict {
            stream_id: StreamId::new("ledger"),
            expected: Version::new(5),
            actual: Version::new(7),
        };

        let display = format!("{error}");
        assert!(display.contains("expected version 5"));
        assert!(display.contains("found 7"));
    }
}
