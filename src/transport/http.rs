//! HTTP client for the topic endpoint protocol, built on `reqwest`.

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use tokio::sync::mpsc;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::io::StreamReader;
use tracing::{debug, info};

use crate::codec::{self, Notification};
use crate::config::ClientSettings;
use crate::subscriber::{
    NotificationSink, SubscriptionId, SubscriptionRunner, WatchEvent, WatchHandle,
};
use crate::transport::{SinceCursor, TopicEndpoint};
use crate::utils::error::{Error, ParseError, Result, TransportError};

/// Raw lines of a streaming response body, without their line endings.
pub(crate) type EventLines = BoxStream<'static, std::result::Result<Bytes, TransportError>>;

/// Client for publishing to, polling and subscribing to topics.
///
/// Cloning is cheap; clones share the underlying connection pools.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    stream_client: Client,
    max_line_bytes: usize,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_secs);

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(Error::ClientBuild)?;

        // No total timeout: the connection is meant to stay open. The read
        // timeout must exceed the server's keepalive interval.
        let stream_client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(Duration::from_secs(settings.stream_read_timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(Error::ClientBuild)?;

        Ok(Self {
            client,
            stream_client,
            max_line_bytes: settings.max_line_bytes,
        })
    }

    /// Publishes `message` to the topic. No retries.
    pub async fn publish(
        &self,
        base_url: &str,
        topic: &str,
        message: &str,
    ) -> std::result::Result<(), TransportError> {
        let url = TopicEndpoint::new(base_url, topic).publish_url();
        debug!(url = %url, "Publishing");

        let response = self
            .client
            .put(&url)
            .body(message.to_string())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
        check_status(&url, &response)?;

        info!(url = %url, "Successfully published");
        Ok(())
    }

    /// Fetches the messages currently buffered for the topic.
    ///
    /// Every line of the response becomes a notification regardless of its
    /// event kind, since the server only returns messages for polls.
    pub async fn poll(
        &self,
        subscription_id: SubscriptionId,
        base_url: &str,
        topic: &str,
    ) -> Result<Vec<Notification>> {
        let url = TopicEndpoint::new(base_url, topic).poll_url();
        debug!(url = %url, subscription_id, "Polling topic");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
        check_status(&url, &response)?;

        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
        let notifications = parse_poll_body(subscription_id, &body)?;

        debug!(url = %url, count = notifications.len(), "Poll finished");
        Ok(notifications)
    }

    /// Opens a streaming subscription and returns immediately.
    ///
    /// The connection is driven by a background task which reports to
    /// `sink`. Cancel it through the returned handle. Must be called from
    /// within a Tokio runtime.
    pub fn subscribe<S: NotificationSink>(
        &self,
        subscription_id: SubscriptionId,
        base_url: &str,
        topic: &str,
        since: SinceCursor,
        sink: S,
    ) -> WatchHandle {
        SubscriptionRunner::new(
            self.clone(),
            subscription_id,
            TopicEndpoint::new(base_url, topic),
            since,
        )
        .spawn(sink)
    }

    /// Like `subscribe`, but delivers into an ordered event channel.
    pub fn subscribe_channel(
        &self,
        subscription_id: SubscriptionId,
        base_url: &str,
        topic: &str,
        since: SinceCursor,
    ) -> (WatchHandle, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(subscription_id, base_url, topic, since, tx);
        (handle, rx)
    }

    /// Sends the stream request and returns the body split into lines once
    /// a success status has been received.
    pub(crate) async fn open_stream(
        &self,
        url: &str,
    ) -> std::result::Result<EventLines, TransportError> {
        let response = self
            .stream_client
            .get(url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;
        check_status(url, &response)?;

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let codec = AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            Vec::new(),
            self.max_line_bytes,
        );
        let url = url.to_string();
        let max = self.max_line_bytes;

        Ok(FramedRead::new(StreamReader::new(body), codec)
            .map_ok(|line| {
                if line.ends_with(b"\r") {
                    line.slice(..line.len() - 1)
                } else {
                    line
                }
            })
            .map_err(move |error| match error {
                AnyDelimiterCodecError::MaxChunkLengthExceeded => TransportError::LineTooLong {
                    url: url.clone(),
                    max,
                },
                AnyDelimiterCodecError::Io(source) => TransportError::Io {
                    url: url.clone(),
                    source,
                },
            })
            .boxed())
    }
}

fn check_status(url: &str, response: &Response) -> std::result::Result<(), TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Decodes a poll response body. Surrounding whitespace is ignored and a
/// body with nothing else yields no notifications. Every remaining line,
/// blank ones included, must decode.
pub(crate) fn parse_poll_body(
    subscription_id: SubscriptionId,
    body: &[u8],
) -> std::result::Result<Vec<Notification>, ParseError> {
    let body = body.trim_ascii();
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .map(|line| codec::decode(line).map(|event| event.into_notification(subscription_id)))
        .collect()
}
