//! The `config` module loads settings from `config/default.*` and from
//! `POPNOTIFY_`-prefixed environment variables (nested keys separated by
//! `__`, e.g. `POPNOTIFY_CLIENT__TIMEOUT_SECS`), falling back to defaults
//! for anything left unspecified.

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{
    ClientSettings, LoggingSettings, PollSettings, ReconnectSettings, Settings,
    SubscriptionSettings,
};

/// Loads the configuration from the default file and environment variables
/// and merges it over `Settings::default()`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("POPNOTIFY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    Ok(Settings {
        client: ClientSettings {
            timeout_secs: partial
                .client
                .as_ref()
                .and_then(|c| c.timeout_secs)
                .unwrap_or(default.client.timeout_secs),
            stream_read_timeout_secs: partial
                .client
                .as_ref()
                .and_then(|c| c.stream_read_timeout_secs)
                .unwrap_or(default.client.stream_read_timeout_secs),
            max_line_bytes: partial
                .client
                .as_ref()
                .and_then(|c| c.max_line_bytes)
                .unwrap_or(default.client.max_line_bytes),
            user_agent: partial
                .client
                .as_ref()
                .and_then(|c| c.user_agent.clone())
                .unwrap_or(default.client.user_agent),
        },
        reconnect: ReconnectSettings {
            initial_backoff_ms: partial
                .reconnect
                .as_ref()
                .and_then(|r| r.initial_backoff_ms)
                .unwrap_or(default.reconnect.initial_backoff_ms),
            max_backoff_ms: partial
                .reconnect
                .as_ref()
                .and_then(|r| r.max_backoff_ms)
                .unwrap_or(default.reconnect.max_backoff_ms),
        },
        poll: PollSettings {
            interval_secs: partial
                .poll
                .as_ref()
                .and_then(|p| p.interval_secs)
                .unwrap_or(default.poll.interval_secs),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .as_ref()
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
        subscriptions: partial.subscriptions.unwrap_or(default.subscriptions),
    })
}
