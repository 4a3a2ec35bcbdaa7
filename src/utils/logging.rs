//! Logging bootstrap.
//!
//! The configured level applies to this crate's own events only, so the
//! HTTP stack stays quiet. `RUST_LOG` replaces the whole filter when set.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

const TARGET: &str = "popnotify";

pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    // try_init: tests call this repeatedly
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Filter enabling `level` for `popnotify` and nothing else.
pub(crate) fn default_filter(level: &str) -> EnvFilter {
    let level = parse_level(level).to_string().to_ascii_lowercase();
    EnvFilter::new(format!("{TARGET}={level}"))
}

/// Maps a configured level name to a filter. Unknown names mean `info`.
pub(crate) fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" | "warning" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}
