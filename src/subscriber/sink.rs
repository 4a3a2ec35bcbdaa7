use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::codec::Notification;
use crate::subscriber::SubscriptionId;
use crate::utils::error::Error;

/// Receives what a running subscription produces.
///
/// Called from the runner's task, in stream order. `on_failure` is called at
/// most once per connection attempt and nothing is called after a runner is
/// cancelled.
pub trait NotificationSink: Send + Sync + 'static {
    fn on_notification(&self, notification: Notification);

    fn on_failure(&self, subscription_id: SubscriptionId, error: Error);

    /// Response headers arrived with a success status.
    fn on_connected(&self, _subscription_id: SubscriptionId) {}
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn on_notification(&self, notification: Notification) {
        (**self).on_notification(notification);
    }

    fn on_failure(&self, subscription_id: SubscriptionId, error: Error) {
        (**self).on_failure(subscription_id, error);
    }

    fn on_connected(&self, subscription_id: SubscriptionId) {
        (**self).on_connected(subscription_id);
    }
}

/// Sink callbacks as channel items.
#[derive(Debug)]
pub enum WatchEvent {
    Connected(SubscriptionId),
    Notification(Notification),
    Failure {
        subscription_id: SubscriptionId,
        error: Error,
    },
}

// A closed receiver means nobody is listening any more; events are dropped.
impl NotificationSink for UnboundedSender<WatchEvent> {
    fn on_notification(&self, notification: Notification) {
        let _ = self.send(WatchEvent::Notification(notification));
    }

    fn on_failure(&self, subscription_id: SubscriptionId, error: Error) {
        let _ = self.send(WatchEvent::Failure {
            subscription_id,
            error,
        });
    }

    fn on_connected(&self, subscription_id: SubscriptionId) {
        let _ = self.send(WatchEvent::Connected(subscription_id));
    }
}
