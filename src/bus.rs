use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::{HotelEvent, Topic};

const CHANNEL_CAPACITY: usize = 256;

/// Typed publish/subscribe hub, one broadcast channel per topic.
/// Injected into the engine; subscribers register and unregister explicitly.
pub struct EventBus {
    channels: DashMap<Topic, broadcast::Sender<HotelEvent>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a topic. Creates the channel if needed.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let sender = self
            .channels
            .entry(topic)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Subscription {
            topic,
            rx: sender.subscribe(),
        }
    }

    /// Publish to the event's topic. Returns how many subscribers got it; 0 if nobody listens.
    pub fn publish(&self, event: &HotelEvent) -> usize {
        let topic = event.topic();
        let delivered = match self.channels.get(&topic) {
            Some(sender) => sender.send(event.clone()).unwrap_or(0),
            None => 0,
        };
        metrics::counter!(crate::observability::EVENTS_PUBLISHED_TOTAL, "topic" => topic.as_str())
            .increment(1);
        tracing::debug!(topic = topic.as_str(), delivered, "event published");
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels
            .get(&topic)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Drop a topic's channel; its subscribers see the stream close.
    pub fn remove(&self, topic: Topic) {
        self.channels.remove(&topic);
    }
}

/// A registered listener on one topic. Dropping it (or calling `unsubscribe`) unregisters it.
pub struct Subscription {
    topic: Topic,
    rx: broadcast::Receiver<HotelEvent>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Next event. `Lagged` means events were dropped; the caller should resync from state.
    pub async fn recv(&mut self) -> Result<HotelEvent, broadcast::error::RecvError> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<HotelEvent, broadcast::error::TryRecvError> {
        self.rx.try_recv()
    }

    pub fn unsubscribe(self) {}
}
