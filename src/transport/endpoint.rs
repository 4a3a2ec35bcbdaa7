use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// A pub/sub channel, identified by the server's base URL and a topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicEndpoint {
    base_url: String,
    topic: String,
}

impl TopicEndpoint {
    pub fn new(base_url: impl Into<String>, topic: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            topic: topic.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publish_url(&self) -> String {
        format!("{}/{}", self.base_url, self.topic)
    }

    pub fn poll_url(&self) -> String {
        format!("{}/{}/json?poll=1", self.base_url, self.topic)
    }

    pub fn stream_url(&self, since: SinceCursor) -> String {
        format!("{}/{}/json?since={}", self.base_url, self.topic, since)
    }
}

impl fmt::Display for TopicEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_url, self.topic)
    }
}

/// Watermark after which messages are considered new.
///
/// Serialized as `all` for the full history, otherwise as the numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinceCursor {
    #[default]
    All,
    At(i64),
}

impl SinceCursor {
    /// Moves the watermark forward to `time`, never backwards.
    pub fn advance(self, time: i64) -> Self {
        match self {
            SinceCursor::At(current) if current >= time => self,
            _ => SinceCursor::from(time),
        }
    }
}

/// A zero watermark means nothing has been seen yet.
impl From<i64> for SinceCursor {
    fn from(value: i64) -> Self {
        if value == 0 {
            SinceCursor::All
        } else {
            SinceCursor::At(value)
        }
    }
}

impl FromStr for SinceCursor {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(SinceCursor::All)
        } else {
            s.parse::<i64>().map(SinceCursor::from)
        }
    }
}

impl fmt::Display for SinceCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinceCursor::All => f.write_str("all"),
            SinceCursor::At(value) => write!(f, "{value}"),
        }
    }
}
