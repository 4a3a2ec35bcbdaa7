//! The `subscriber` module keeps streaming connections to watched topics.
//!
//! - `SubscriptionRunner` owns a single connection attempt: it opens the
//!   stream, decodes it line by line and reports each message to a
//!   `NotificationSink` as it arrives. It never reconnects by itself.
//! - `WatchHandle` cancels a runner and observes its `RunnerState`.
//! - `Watcher` is the owning process: it keeps one supervised connection per
//!   subscription and reopens failed ones with backoff, resuming from the
//!   time of the last delivered notification.
//! - `Poller` polls subscriptions without instant delivery on an interval.

pub mod poller;
pub mod runner;
pub mod sink;
pub mod subscription;
pub mod watcher;

pub use poller::Poller;
pub use runner::{RunnerState, SubscriptionRunner, WatchHandle, stop_watching};
pub use sink::{NotificationSink, WatchEvent};
pub use subscription::{SubscriptionDescriptor, SubscriptionId};
pub use watcher::Watcher;
