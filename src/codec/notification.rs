use serde::{Deserialize, Serialize};

use crate::subscriber::SubscriptionId;

/// A message surfaced to the delivery collaborator.
///
/// `id` is taken verbatim from the wire event; downstream deduplication
/// relies on it. The engine never persists notifications, so `delivered`
/// is always `false` when produced here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub subscription_id: SubscriptionId,
    pub time: i64,
    pub message: String,
    pub delivered: bool,
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        subscription_id: SubscriptionId,
        time: i64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subscription_id,
            time,
            message: message.into(),
            delivered: false,
        }
    }
}
