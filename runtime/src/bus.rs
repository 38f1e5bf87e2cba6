//! In-process event bus over Tokio broadcast channels.
//!
//! One broadcast channel per topic. Subscribers receive every event
//! published after they subscribe; a lagging subscriber drops oldest events
//! (surfaced as a stream error), which matches the at-least-once,
//! must-be-idempotent contract of [`EventBus`].

use futures::StreamExt;
use marquee_core::event::SerializedEvent;
use marquee_core::event_bus::{EventBus, EventBusError, EventStream};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// In-process [`EventBus`] implementation.
///
/// Suitable for single-process deployments and tests; a brokered bus can be
/// swapped in behind the same trait.
pub struct BroadcastEventBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<SerializedEvent>>>>,
    capacity: usize,
}

impl BroadcastEventBus {
    /// Create a bus with the given per-topic buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    fn sender_for(&self, topic: &str) -> Result<broadcast::Sender<SerializedEvent>, EventBusError> {
        let mut topics = self
            .topics
            .lock()
            .map_err(|_| EventBusError::Other("topic registry poisoned".to_string()))?;
        Ok(topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone())
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let sender = self.sender_for(topic);
        let event = event.clone();
        let topic = topic.to_string();
        Box::pin(async move {
            // A send error only means there are no subscribers right now;
            // the event store already holds the durable copy.
            if let Ok(sender) = sender {
                let _ = sender.send(event);
                Ok(())
            } else {
                Err(EventBusError::PublishFailed {
                    topic,
                    reason: "topic registry unavailable".to_string(),
                })
            }
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let receivers: Result<Vec<_>, EventBusError> = topics
            .iter()
            .map(|topic| self.sender_for(topic).map(|s| s.subscribe()))
            .collect();

        Box::pin(async move {
            let receivers = receivers?;
            let streams = receivers.into_iter().map(|rx| {
                BroadcastStream::new(rx).map(|item| {
                    item.map_err(|e| EventBusError::Other(format!("subscriber lagged: {e}")))
                })
            });
            let merged = futures::stream::select_all(streams);
            Ok(Box::pin(merged) as EventStream)
        })
    }
}
