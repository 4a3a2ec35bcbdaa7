//! Watcher
//!
//! The process that owns subscription runners. For every watched
//! subscription it runs a supervisor task which:
//! - opens a runner with the current `since` cursor
//! - forwards the runner's events to the outer sink, advancing the cursor
//!   to the time of each delivered notification
//! - after a failure, waits an exponential backoff (reset once a connection
//!   succeeds) and opens a fresh runner from the advanced cursor
//!
//! Delivery is at-least-once: resuming from the last seen time may repeat
//! messages, which the sink is expected to deduplicate by id.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ReconnectSettings;
use crate::subscriber::{NotificationSink, SubscriptionDescriptor, SubscriptionId, WatchEvent};
use crate::transport::ApiClient;

struct Supervised {
    descriptor: SubscriptionDescriptor,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct Watcher {
    client: ApiClient,
    reconnect: ReconnectSettings,
    sink: Arc<dyn NotificationSink>,
    connections: Mutex<HashMap<SubscriptionId, Supervised>>,
}

impl Watcher {
    pub fn new<S: NotificationSink>(
        client: ApiClient,
        reconnect: ReconnectSettings,
        sink: S,
    ) -> Self {
        Self {
            client,
            reconnect,
            sink: Arc::new(sink),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Starts watching the subscription. Returns `false` if it is already
    /// being watched.
    pub fn start_watching(&self, descriptor: SubscriptionDescriptor) -> bool {
        let mut connections = self.lock();
        if connections.contains_key(&descriptor.id) {
            return false;
        }

        info!(
            subscription_id = descriptor.id,
            endpoint = %descriptor.endpoint(),
            "Starting to watch subscription"
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(supervise(
            self.client.clone(),
            descriptor.clone(),
            self.reconnect.clone(),
            self.sink.clone(),
            cancel.clone(),
        ));
        connections.insert(
            descriptor.id,
            Supervised {
                descriptor,
                cancel,
                task,
            },
        );
        true
    }

    /// Stops watching the subscription. Returns `false` if it was not
    /// being watched.
    pub fn stop_watching(&self, subscription_id: SubscriptionId) -> bool {
        match self.lock().remove(&subscription_id) {
            Some(supervised) => {
                info!(subscription_id, "Stopping to watch subscription");
                supervised.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Reconciles the watched set with `descriptors`: new subscriptions are
    /// started, missing ones stopped, and changed ones restarted. Unchanged
    /// subscriptions keep their connection.
    pub fn refresh(&self, descriptors: &[SubscriptionDescriptor]) {
        let wanted: HashSet<SubscriptionId> = descriptors.iter().map(|d| d.id).collect();

        let stale: Vec<SubscriptionId> = {
            let connections = self.lock();
            connections
                .iter()
                .filter(|(id, supervised)| {
                    !wanted.contains(*id)
                        || descriptors.iter().any(|d| {
                            d.id == **id && d.endpoint() != supervised.descriptor.endpoint()
                        })
                })
                .map(|(id, _)| *id)
                .collect()
        };
        for id in stale {
            self.stop_watching(id);
        }

        for descriptor in descriptors {
            self.start_watching(descriptor.clone());
        }
    }

    pub fn is_watching(&self, subscription_id: SubscriptionId) -> bool {
        self.lock().contains_key(&subscription_id)
    }

    pub fn watched(&self) -> Vec<SubscriptionId> {
        let mut ids: Vec<SubscriptionId> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Stops every connection and waits for the supervisors to end.
    pub async fn shutdown(&self) {
        let drained: Vec<Supervised> = self.lock().drain().map(|(_, s)| s).collect();
        info!(count = drained.len(), "Shutting down watcher");

        for supervised in &drained {
            supervised.cancel.cancel();
        }
        join_all(drained.into_iter().map(|s| s.task)).await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, Supervised>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("watched", &self.watched())
            .finish()
    }
}

async fn supervise(
    client: ApiClient,
    descriptor: SubscriptionDescriptor,
    reconnect: ReconnectSettings,
    sink: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
) {
    let mut since = descriptor.since;
    let mut backoff = reconnect.initial_backoff();

    loop {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = client.subscribe(
            descriptor.id,
            &descriptor.base_url,
            &descriptor.topic,
            since,
            tx,
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    handle.cancel();
                    return;
                }
                event = rx.recv() => event,
            };

            match event {
                Some(WatchEvent::Connected(id)) => {
                    backoff = reconnect.initial_backoff();
                    sink.on_connected(id);
                }
                Some(WatchEvent::Notification(notification)) => {
                    since = since.advance(notification.time);
                    sink.on_notification(notification);
                }
                Some(WatchEvent::Failure {
                    subscription_id,
                    error,
                }) => {
                    sink.on_failure(subscription_id, error);
                    break;
                }
                None => break,
            }
        }

        info!(
            subscription_id = descriptor.id,
            since = %since,
            delay_ms = backoff.as_millis() as u64,
            "Reconnecting after backoff"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = next_backoff(backoff, reconnect.max_backoff());
        debug!(subscription_id = descriptor.id, "Reopening subscription connection");
    }
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

#[cfg(test)]
pub(crate) fn backoff_sequence(reconnect: &ReconnectSettings, steps: usize) -> Vec<Duration> {
    let mut out = Vec::with_capacity(steps);
    let mut current = reconnect.initial_backoff();
    for _ in 0..steps {
        out.push(current);
        current = next_backoff(current, reconnect.max_backoff());
    }
    out
}
