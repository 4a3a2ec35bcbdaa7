//! Error taxonomy for the notification engine.
//!
//! - `TransportError`: a request could not be completed, either because the
//!   server answered with a non-2xx status or because I/O failed. Always
//!   carries the target URL.
//! - `ParseError`: a line of the wire protocol could not be decoded. Carries
//!   the offending line.
//! - `Error`: the crate-wide error wrapping the above plus configuration and
//!   lifecycle failures.
//!
//! Cancelling a subscription is not an error and has no variant here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unexpected response {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading from {url} failed: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected response for {url}: body is empty")]
    EmptyBody { url: String },

    #[error("connection to {url} closed by server")]
    StreamClosed { url: String },

    #[error("line from {url} exceeds {max} bytes")]
    LineTooLong { url: String, max: usize },
}

impl TransportError {
    pub fn url(&self) -> &str {
        match self {
            TransportError::Status { url, .. }
            | TransportError::Request { url, .. }
            | TransportError::Io { url, .. }
            | TransportError::EmptyBody { url }
            | TransportError::StreamClosed { url }
            | TransportError::LineTooLong { url, .. } => url,
        }
    }

    /// HTTP status of the response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Request { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("malformed event line {line:?}: {source}")]
pub struct ParseError {
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

impl ParseError {
    pub fn new(line: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            line: line.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("service lifecycle command failed: {0}")]
    Lifecycle(String),
}

pub type Result<T> = std::result::Result<T, Error>;
