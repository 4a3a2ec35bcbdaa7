use std::time::Duration;

use serde::Deserialize;

use crate::subscriber::{SubscriptionDescriptor, SubscriptionId};

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub client: ClientSettings,
    pub reconnect: ReconnectSettings,
    pub poll: PollSettings,
    pub logging: LoggingSettings,
    pub subscriptions: Vec<SubscriptionSettings>,
}

/// HTTP client settings.
///
/// `timeout_secs` bounds connect, read and the whole call for publish and
/// poll. Streams only use `stream_read_timeout_secs`, which must be longer
/// than the server's keepalive interval. A streamed line longer than
/// `max_line_bytes` fails the connection.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub stream_read_timeout_secs: u64,
    pub max_line_bytes: usize,
    pub user_agent: String,
}

/// Backoff applied by the watcher between reconnect attempts.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconnectSettings {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl ReconnectSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms.max(self.initial_backoff_ms))
    }
}

/// How often subscriptions without instant delivery are polled.
#[derive(Debug, Deserialize, Clone)]
pub struct PollSettings {
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// A subscription as listed in the configuration file.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SubscriptionSettings {
    pub id: SubscriptionId,
    pub base_url: String,
    pub topic: String,
    #[serde(default)]
    pub instant: bool,
}

impl From<&SubscriptionSettings> for SubscriptionDescriptor {
    fn from(s: &SubscriptionSettings) -> Self {
        SubscriptionDescriptor::new(s.id, &s.base_url, &s.topic).instant(s.instant)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub client: Option<PartialClientSettings>,
    pub reconnect: Option<PartialReconnectSettings>,
    pub poll: Option<PartialPollSettings>,
    pub logging: Option<PartialLoggingSettings>,
    pub subscriptions: Option<Vec<SubscriptionSettings>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialClientSettings {
    pub timeout_secs: Option<u64>,
    pub stream_read_timeout_secs: Option<u64>,
    pub max_line_bytes: Option<usize>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialReconnectSettings {
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPollSettings {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            reconnect: ReconnectSettings::default(),
            poll: PollSettings { interval_secs: 900 },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
            subscriptions: Vec::new(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            stream_read_timeout_secs: 77,
            max_line_bytes: 1024 * 1024,
            user_agent: concat!("popnotify/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1_000,
            max_backoff_ms: 60_000,
        }
    }
}
