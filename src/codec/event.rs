use serde::Deserialize;

use crate::codec::Notification;
use crate::subscriber::SubscriptionId;
use crate::utils::error::ParseError;

/// Kind tag of a wire event.
///
/// Adding a new keepalive-like kind means one new variant and one arm in
/// `RawEvent::into_delivery`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Open,
    Keepalive,
    Message,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Open => "open",
            EventKind::Keepalive => "keepalive",
            EventKind::Message => "message",
            EventKind::Other(kind) => kind,
        }
    }
}

impl From<String> for EventKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "open" => EventKind::Open,
            "keepalive" => EventKind::Keepalive,
            "message" => EventKind::Message,
            _ => EventKind::Other(kind),
        }
    }
}

/// One decoded line of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawEvent {
    pub id: String,
    /// Epoch seconds.
    pub time: i64,
    #[serde(rename = "event", deserialize_with = "deserialize_kind")]
    pub kind: EventKind,
    pub message: String,
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<EventKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(EventKind::from)
}

impl RawEvent {
    /// Converts the event into a notification regardless of its kind.
    ///
    /// Used for poll results, which the server has already filtered.
    pub fn into_notification(self, subscription_id: SubscriptionId) -> Notification {
        Notification::new(self.id, subscription_id, self.time, self.message)
    }

    /// Converts the event into a notification only if it is a `message`
    /// event. Used on streams, where keepalives are interleaved.
    pub fn into_delivery(self, subscription_id: SubscriptionId) -> Option<Notification> {
        match self.kind {
            EventKind::Message => Some(self.into_notification(subscription_id)),
            EventKind::Open | EventKind::Keepalive | EventKind::Other(_) => None,
        }
    }
}

/// Decodes a single line into a `RawEvent`.
///
/// Fails if the line is not well-formed UTF-8 JSON or any of `id`, `time`,
/// `event` and `message` is missing. A blank line is malformed too. The
/// error keeps a lossy copy of the line.
pub fn decode(line: impl AsRef<[u8]>) -> Result<RawEvent, ParseError> {
    let line = line.as_ref();
    serde_json::from_slice(line)
        .map_err(|source| ParseError::new(String::from_utf8_lossy(line), source))
}
