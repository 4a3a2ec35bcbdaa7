//! # PopNotify
//!
//! `popnotify` is a notification delivery engine for HTTP pub/sub topics.
//! For each watched topic it surfaces every published message, either via a
//! one-shot poll or a persistent stream of newline-delimited JSON events,
//! with at-least-once delivery and failure reporting.
//!
//! ## Core Modules
//!
//! - `codec`: decodes single wire lines into events and notifications.
//! - `transport`: the HTTP client (publish, poll, subscribe).
//! - `subscriber`: subscription runners, their handles, and the reconnecting
//!   `Watcher` that owns them.
//! - `service`: decides whether the background streaming process should run
//!   and starts or stops it idempotently.
//! - `config`: settings loaded from file and environment.
//! - `utils`: error types and logging.

pub mod codec;
pub mod config;
pub mod service;
pub mod subscriber;
pub mod transport;
pub mod utils;

pub use codec::Notification;
pub use subscriber::{NotificationSink, SubscriptionDescriptor, SubscriptionId, WatchHandle};
pub use transport::{ApiClient, SinceCursor};
pub use utils::error::{Error, Result};
