//! Subscription runner
//!
//! One runner drives one connection attempt through the states
//! `Connecting -> Streaming -> Failed`, or to `Cancelled` from any state.
//! Each `message` line is handed to the sink before the next line is read,
//! so notifications are observed in arrival order and never batched. A
//! decode error, an I/O error or the server closing the connection all end
//! the runner with exactly one `on_failure` call.
//!
//! Every sink callback runs under the runner's delivery gate, which
//! `WatchHandle::cancel` also takes. Once `cancel` returns, no callback is
//! running and none will start.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::codec;
use crate::subscriber::{NotificationSink, SubscriptionId};
use crate::transport::{ApiClient, SinceCursor, TopicEndpoint};
use crate::utils::error::{Error, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Connecting,
    Streaming,
    Failed,
    Cancelled,
}

impl RunnerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunnerState::Failed | RunnerState::Cancelled)
    }
}

#[derive(Debug)]
pub struct SubscriptionRunner {
    client: ApiClient,
    subscription_id: SubscriptionId,
    endpoint: TopicEndpoint,
    since: SinceCursor,
    connection_id: String,
}

impl SubscriptionRunner {
    pub fn new(
        client: ApiClient,
        subscription_id: SubscriptionId,
        endpoint: TopicEndpoint,
        since: SinceCursor,
    ) -> Self {
        Self {
            client,
            subscription_id,
            endpoint,
            since,
            connection_id: Uuid::new_v4().to_string(),
        }
    }

    /// Starts the connection on a background task.
    pub fn spawn<S: NotificationSink>(self, sink: S) -> WatchHandle {
        let gate = DeliveryGate::default();
        let (state_tx, state_rx) = watch::channel(RunnerState::Connecting);
        let subscription_id = self.subscription_id;
        let connection_id = self.connection_id.clone();

        let task = tokio::spawn(self.run(sink, gate.clone(), state_tx));

        WatchHandle {
            subscription_id,
            connection_id,
            gate,
            state: state_rx,
            task,
        }
    }

    async fn run<S: NotificationSink>(
        self,
        sink: S,
        gate: DeliveryGate,
        state: watch::Sender<RunnerState>,
    ) {
        let url = self.endpoint.stream_url(self.since);
        info!(
            subscription_id = self.subscription_id,
            connection_id = %self.connection_id,
            url = %url,
            "Opening subscription connection"
        );

        // Dropping the stream future aborts the underlying request.
        let outcome = tokio::select! {
            biased;
            _ = gate.token.cancelled() => None,
            result = self.stream(&url, &sink, &gate, &state) => Some(result),
        };

        let failed = match outcome {
            Some(Err(error)) => gate.deliver(|| {
                warn!(
                    subscription_id = self.subscription_id,
                    connection_id = %self.connection_id,
                    url = %url,
                    error = %error,
                    "Subscription connection failed"
                );
                sink.on_failure(self.subscription_id, error);
            }),
            _ => false,
        };

        if failed {
            state.send_replace(RunnerState::Failed);
        } else {
            debug!(
                subscription_id = self.subscription_id,
                connection_id = %self.connection_id,
                "Subscription connection cancelled"
            );
            state.send_replace(RunnerState::Cancelled);
        }
    }

    /// Returns `Ok` only when cancellation is noticed between lines.
    async fn stream<S: NotificationSink>(
        &self,
        url: &str,
        sink: &S,
        gate: &DeliveryGate,
        state: &watch::Sender<RunnerState>,
    ) -> Result<(), Error> {
        let mut lines = self.client.open_stream(url).await?;

        state.send_replace(RunnerState::Streaming);
        if !gate.deliver(|| sink.on_connected(self.subscription_id)) {
            return Ok(());
        }

        let mut received_any = false;
        loop {
            let Some(line) = lines.next().await.transpose()? else {
                let url = url.to_string();
                return Err(if received_any {
                    TransportError::StreamClosed { url }
                } else {
                    TransportError::EmptyBody { url }
                }
                .into());
            };
            received_any = true;

            let event = codec::decode(&line)?;
            trace!(
                subscription_id = self.subscription_id,
                kind = event.kind.as_str(),
                id = %event.id,
                "Received event"
            );

            if let Some(notification) = event.into_delivery(self.subscription_id) {
                if !gate.deliver(|| sink.on_notification(notification)) {
                    return Ok(());
                }
            }
        }
    }
}

/// Cancellation token paired with the lock that sink callbacks run under.
#[derive(Debug, Clone, Default)]
struct DeliveryGate {
    token: CancellationToken,
    lock: Arc<Mutex<()>>,
}

impl DeliveryGate {
    fn cancel(&self) {
        let _held = self.lock();
        self.token.cancel();
    }

    /// Runs `callback` unless the runner is cancelled. Returns whether it ran.
    fn deliver(&self, callback: impl FnOnce()) -> bool {
        let _held = self.lock();
        if self.token.is_cancelled() {
            return false;
        }
        callback();
        true
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle does not stop the connection; call `cancel`.
#[derive(Debug)]
pub struct WatchHandle {
    subscription_id: SubscriptionId,
    connection_id: String,
    gate: DeliveryGate,
    state: watch::Receiver<RunnerState>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Aborts the connection. No sink callback fires after this returns.
    ///
    /// Waits for a callback already in progress, so it must not be called
    /// from inside this subscription's own sink callbacks.
    pub fn cancel(&self) {
        self.gate.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.token.is_cancelled()
    }

    pub fn state(&self) -> RunnerState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until the state satisfies `predicate` or the runner ends, and
    /// returns the state at that point.
    pub async fn wait_for_state<F>(&self, predicate: F) -> RunnerState
    where
        F: Fn(RunnerState) -> bool,
    {
        let mut rx = self.state.clone();
        let reached = rx.wait_for(|state| predicate(*state)).await.map(|state| *state);
        match reached {
            Ok(state) => state,
            Err(_) => *rx.borrow(),
        }
    }

    /// Waits for the runner task to end and returns its final state.
    pub async fn join(self) -> RunnerState {
        if let Err(e) = self.task.await {
            warn!(
                subscription_id = self.subscription_id,
                error = %e,
                "Subscription task ended abnormally"
            );
        }
        *self.state.borrow()
    }
}

/// Stops a subscription started with `ApiClient::subscribe`.
pub fn stop_watching(handle: &WatchHandle) {
    handle.cancel();
}
