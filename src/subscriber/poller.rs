//! Periodic polling for subscriptions without instant delivery.
//!
//! A poll returns everything the server still caches for the topic, so each
//! round only hands on the ids the previous round did not return. Ids that
//! drop out of the cache are forgotten.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::subscriber::{NotificationSink, SubscriptionDescriptor, SubscriptionId};
use crate::transport::ApiClient;

#[derive(Debug)]
pub struct Poller {
    client: ApiClient,
    subscriptions: Vec<SubscriptionDescriptor>,
    interval: Duration,
    seen: HashMap<SubscriptionId, HashSet<String>>,
}

impl Poller {
    pub fn new(
        client: ApiClient,
        subscriptions: Vec<SubscriptionDescriptor>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            subscriptions,
            interval: interval.max(Duration::from_secs(1)),
            seen: HashMap::new(),
        }
    }

    /// Polls every subscription once. New notifications go to
    /// `on_notification`, poll errors to `on_failure`.
    pub async fn poll_once<S: NotificationSink>(&mut self, sink: &S) {
        for descriptor in &self.subscriptions {
            let result = self
                .client
                .poll(descriptor.id, &descriptor.base_url, &descriptor.topic)
                .await;

            match result {
                Ok(notifications) => {
                    let previous = self.seen.remove(&descriptor.id).unwrap_or_default();
                    let current: HashSet<String> =
                        notifications.iter().map(|n| n.id.clone()).collect();

                    let fresh: Vec<_> = notifications
                        .into_iter()
                        .filter(|n| !previous.contains(&n.id))
                        .collect();
                    debug!(
                        subscription_id = descriptor.id,
                        fresh = fresh.len(),
                        cached = current.len(),
                        "Polled subscription"
                    );
                    fresh.into_iter().for_each(|n| sink.on_notification(n));

                    self.seen.insert(descriptor.id, current);
                }
                Err(error) => sink.on_failure(descriptor.id, error),
            }
        }
    }

    /// Polls on a fixed interval, starting immediately, until the returned
    /// task is aborted.
    pub fn spawn<S: NotificationSink>(mut self, sink: S) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                self.poll_once(&sink).await;
            }
        })
    }
}
