//! Mock implementations of environment and infrastructure traits.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use marquee_core::environment::Clock;
use marquee_core::event::SerializedEvent;
use marquee_core::event_bus::{EventBus, EventBusError, EventStream};
use marquee_core::event_store::{EventStore, EventStoreError};
use marquee_core::stream::{StreamId, Version};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Fixed clock: always returns the same time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a clock pinned to `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Default fixed clock for tests (2025-01-01 00:00:00 UTC).
///
/// # Panics
///
/// Panics only if the hardcoded timestamp fails to parse, which cannot
/// happen.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

/// In-memory [`EventStore`] with full optimistic-concurrency semantics.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<Mutex<HashMap<StreamId, Vec<SerializedEvent>>>>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events currently stored in `stream_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn event_count(&self, stream_id: &StreamId) -> usize {
        self.streams
            .lock()
            .expect("stream map lock poisoned")
            .get(stream_id)
            .map_or(0, Vec::len)
    }
}

impl EventStore for InMemoryEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
        let streams = Arc::clone(&self.streams);
        Box::pin(async move {
            let mut streams = streams
                .lock()
                .map_err(|_| EventStoreError::StorageError("stream map poisoned".to_string()))?;

            let stream = streams.entry(stream_id.clone()).or_default();
            let current = Version::new(stream.len() as u64);

            if let Some(expected) = expected_version {
                if expected != current {
                    return Err(EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual: current,
                    });
                }
            }

            let count = events.len() as u64;
            stream.extend(events);
            Ok(current.advanced_by(count))
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>
    {
        let streams = Arc::clone(&self.streams);
        Box::pin(async move {
            let streams = streams
                .lock()
                .map_err(|_| EventStoreError::StorageError("stream map poisoned".to_string()))?;

            let Some(stream) = streams.get(&stream_id) else {
                return Ok(Vec::new());
            };

            // Version v is the state after v events, so "from v" skips v-1.
            let skip = from_version.map_or(0, |v| v.value().saturating_sub(1) as usize);
            Ok(stream.iter().skip(skip).cloned().collect())
        })
    }
}

/// In-memory [`EventBus`] that records every published event.
pub struct InMemoryEventBus {
    published: Arc<Mutex<Vec<(String, SerializedEvent)>>>,
    sender: broadcast::Sender<(String, SerializedEvent)>,
}

impl InMemoryEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            sender,
        }
    }

    /// Every `(topic, event)` published so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn published(&self) -> Vec<(String, SerializedEvent)> {
        self.published.lock().expect("publish log poisoned").clone()
    }

    /// Event types published to `topic`, in order.
    #[must_use]
    pub fn event_types(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, e)| e.event_type)
            .collect()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let published = Arc::clone(&self.published);
        let sender = self.sender.clone();
        let topic = topic.to_string();
        let event = event.clone();
        Box::pin(async move {
            published
                .lock()
                .map_err(|_| EventBusError::PublishFailed {
                    topic: topic.clone(),
                    reason: "publish log poisoned".to_string(),
                })?
                .push((topic.clone(), event.clone()));
            let _ = sender.send((topic, event));
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let wanted: Vec<String> = topics.iter().map(ToString::to_string).collect();
        let rx = self.sender.subscribe();
        Box::pin(async move {
            let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
                .filter_map(move |item| {
                    let wanted = wanted.clone();
                    async move {
                        match item {
                            Ok((topic, event)) if wanted.contains(&topic) => Some(Ok(event)),
                            Ok(_) => None,
                            Err(e) => {
                                Some(Err(EventBusError::Other(format!("subscriber lagged: {e}"))))
                            }
                        }
                    }
                });
            Ok(Box::pin(stream) as EventStream)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event(event_type: &str) -> SerializedEvent {
        SerializedEvent::new(event_type.to_string(), vec![0xAB], None)
    }

    #[tokio::test]
    async fn append_and_load_round_trip() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("ledger");

        let v1 = store
            .append_events(stream.clone(), Some(Version::new(0)), vec![event("A.v1")])
            .await
            .unwrap();
        assert_eq!(v1, Version::new(1));

        let v2 = store
            .append_events(stream.clone(), Some(v1), vec![event("B.v1"), event("C.v1")])
            .await
            .unwrap();
        assert_eq!(v2, Version::new(3));

        let all = store.load_events(stream.clone(), None).await.unwrap();
        assert_eq!(all.len(), 3);

        let tail = store.load_events(stream, Some(Version::new(2))).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].event_type, "B.v1");
    }

    #[tokio::test]
    async fn append_detects_version_conflict() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("ledger");

        store
            .append_events(stream.clone(), None, vec![event("A.v1")])
            .await
            .unwrap();

        let conflict = store
            .append_events(stream, Some(Version::new(0)), vec![event("B.v1")])
            .await;
        assert!(matches!(
            conflict,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn bus_records_and_filters_by_topic() {
        let bus = InMemoryEventBus::new();
        bus.publish("ledger", &event("A.v1")).await.unwrap();
        bus.publish("catalog", &event("B.v1")).await.unwrap();

        assert_eq!(bus.event_types("ledger"), vec!["A.v1"]);
        assert_eq!(bus.published().len(), 2);
    }

    #[test]
    fn fixed_clock_is_deterministic() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }
}
