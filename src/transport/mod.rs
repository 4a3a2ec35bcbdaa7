//! The `transport` module talks HTTP to a pub/sub topic endpoint.
//!
//! Three operations are supported against `{base_url}/{topic}`:
//! - publish: `PUT` with the raw message as body
//! - poll: `GET .../json?poll=1`, returning the buffered messages at once
//! - subscribe: `GET .../json?since=...`, a long-lived response whose body
//!   is an unbounded stream of newline-delimited JSON events
//!
//! Publish and poll share one client with a bounded total timeout. Streams
//! use a second client with a longer per-read timeout and no total timeout,
//! so a silent stall is detected as a failure while a healthy connection may
//! live indefinitely.

pub mod endpoint;
pub mod http;

pub use endpoint::{SinceCursor, TopicEndpoint};
pub use http::ApiClient;

#[cfg(test)]
mod tests;
