use crate::transport::{SinceCursor, TopicEndpoint};

pub type SubscriptionId = u64;

/// Describes a topic to watch, as handed over by the subscription store.
///
/// The engine only reads descriptors. The reconnect watermark lives in the
/// `Watcher`'s memory, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDescriptor {
    pub id: SubscriptionId,
    pub base_url: String,
    pub topic: String,
    pub since: SinceCursor,
    /// Deliver through a persistent stream rather than periodic polling.
    pub instant: bool,
}

impl SubscriptionDescriptor {
    pub fn new(id: SubscriptionId, base_url: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id,
            base_url: base_url.into(),
            topic: topic.into(),
            since: SinceCursor::All,
            instant: false,
        }
    }

    pub fn instant(mut self, instant: bool) -> Self {
        self.instant = instant;
        self
    }

    pub fn since(mut self, since: SinceCursor) -> Self {
        self.since = since;
        self
    }

    pub fn endpoint(&self) -> TopicEndpoint {
        TopicEndpoint::new(&self.base_url, &self.topic)
    }

    /// The `(id, instant)` pair the service controller decides on.
    pub fn instant_status(&self) -> (SubscriptionId, bool) {
        (self.id, self.instant)
    }
}
