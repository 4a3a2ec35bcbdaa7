//! The `codec` module turns single lines of the newline-delimited JSON wire
//! protocol into structured events, and events into `Notification`s.
//!
//! Each line is one JSON object `{id, time, event, message}`. Only events of
//! kind `message` carry a deliverable notification on a stream; `open` and
//! `keepalive` (and any kind this client does not know) are recognised and
//! discarded by the caller.

pub mod event;
pub mod notification;

pub use event::{EventKind, RawEvent, decode};
pub use notification::Notification;

#[cfg(test)]
mod tests;
