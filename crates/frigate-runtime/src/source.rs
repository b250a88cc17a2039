//! Frigate HTTP API client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};
use url::Url;

use frigate_models::{Event, PollMode};

use crate::error::{RelayError, Result};

/// Parameters of one events query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Maximum number of events returned.
    pub limit: u32,
    /// Only events that started before this unix timestamp.
    pub before: Option<i64>,
    /// Ask for events that are still being tracked.
    pub in_progress: bool,
}

impl EventQuery {
    /// Builds the query a poll loop in `mode` sends at `now`.
    pub fn for_mode(mode: PollMode, limit: u32, before_offset: Duration, now: DateTime<Utc>) -> Self {
        match mode {
            PollMode::Default => Self {
                limit,
                before: Some(now.timestamp() - before_offset.as_secs() as i64),
                in_progress: false,
            },
            PollMode::InProgressWatch => Self {
                limit,
                before: None,
                in_progress: true,
            },
            PollMode::TextWatch => Self {
                limit,
                before: None,
                in_progress: false,
            },
        }
    }
}

/// Result of a clip download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipDownload {
    /// HTTP status of the response.
    pub status: u16,
    /// Bytes written to disk.
    pub bytes: u64,
}

impl ClipDownload {
    /// True for a 200 response.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Where events and clips come from.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetches the events matching `query`.
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<Event>>;

    /// Streams the clip of `event_id` into `dest`.
    ///
    /// A non-200 response is not an error: whatever body was sent is
    /// written and the status is returned for the caller to report.
    async fn fetch_clip(&self, event_id: &str, dest: &Path) -> Result<ClipDownload>;
}

/// `EventSource` backed by the Frigate REST API.
#[derive(Debug, Clone)]
pub struct FrigateClient {
    base_url: Url,
    client: reqwest::Client,
}

impl FrigateClient {
    /// Creates a client for the API rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RelayError::Http {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { base_url, client })
    }

    /// The normalised base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the events endpoint for `query`.
    pub fn events_url(&self, query: &EventQuery) -> Result<Url> {
        let mut url = self.base_url.join("api/events")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(before) = query.before {
                pairs.append_pair("before", &before.to_string());
            }
            if query.in_progress {
                pairs.append_pair("in_progress", "1");
            }
        }
        Ok(url)
    }

    /// URL of the clip of `event_id`.
    pub fn clip_url(&self, event_id: &str) -> Result<Url> {
        let mut url = self.base_url.join("api/events/")?;
        url.path_segments_mut()
            .map_err(|_| RelayError::Http {
                url: self.base_url.to_string(),
                message: "base url cannot hold a path".to_string(),
            })?
            .pop_if_empty()
            .push(event_id)
            .push("clip.mp4");
        Ok(url)
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RelayError::Http {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl EventSource for FrigateClient {
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let url = self.events_url(query)?;
        trace!(url = %url, "fetching events");

        let response = self.get(&url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| RelayError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let events = decode_events(&body).map_err(|(message, offset)| RelayError::Decode {
            url: url.to_string(),
            message,
            offset,
        })?;

        debug!(count = events.len(), in_progress = query.in_progress, "events fetched");
        Ok(events)
    }

    async fn fetch_clip(&self, event_id: &str, dest: &Path) -> Result<ClipDownload> {
        let url = self.clip_url(event_id)?;
        trace!(event_id = %event_id, url = %url, "downloading clip");

        let mut response = self.get(&url).await?;
        let status = response.status().as_u16();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(dest).await?;
        let mut bytes = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| RelayError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })? {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(event_id = %event_id, status, bytes, "clip downloaded");
        Ok(ClipDownload { status, bytes })
    }
}

/// Decodes an events payload, returning the error message and the byte
/// offset it points at on failure.
pub fn decode_events(body: &[u8]) -> std::result::Result<Vec<Event>, (String, usize)> {
    serde_json::from_slice(body)
        .map_err(|e| (e.to_string(), byte_offset(body, e.line(), e.column())))
}

/// Converts a 1-based line/column position into a byte offset in `body`.
pub(crate) fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        body.iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map(|(i, _)| i + 1)
            .unwrap_or(body.len())
    };
    (line_start + column.saturating_sub(1)).min(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_for_mode() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let limit = 20;
        let offset = Duration::from_secs(300);

        let q = EventQuery::for_mode(PollMode::Default, limit, offset, now);
        assert_eq!(q.before, Some(1_699_999_700));
        assert!(!q.in_progress);

        let q = EventQuery::for_mode(PollMode::InProgressWatch, limit, offset, now);
        assert_eq!(q.before, None);
        assert!(q.in_progress);

        let q = EventQuery::for_mode(PollMode::TextWatch, limit, offset, now);
        assert_eq!(q, EventQuery { limit: 20, before: None, in_progress: false });
    }

    #[test]
    fn test_events_url() {
        let client = FrigateClient::new("http://nvr:5000").unwrap();

        let url = client
            .events_url(&EventQuery { limit: 20, before: Some(1_699_999_700), in_progress: false })
            .unwrap();
        assert_eq!(url.as_str(), "http://nvr:5000/api/events?limit=20&before=1699999700");

        let url = client
            .events_url(&EventQuery { limit: 5, before: None, in_progress: true })
            .unwrap();
        assert_eq!(url.as_str(), "http://nvr:5000/api/events?limit=5&in_progress=1");
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = FrigateClient::new("https://home.example.com/frigate").unwrap();
        let url = client.clip_url("1700000000.1-abc").unwrap();
        assert_eq!(
            url.as_str(),
            "https://home.example.com/frigate/api/events/1700000000.1-abc/clip.mp4"
        );
    }

    #[test]
    fn test_clip_url_escapes_id() {
        let client = FrigateClient::new("http://nvr:5000/").unwrap();
        let url = client.clip_url("a/b").unwrap();
        assert_eq!(url.as_str(), "http://nvr:5000/api/events/a%2Fb/clip.mp4");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(FrigateClient::new("not a url"), Err(RelayError::InvalidUrl(_))));
    }

    #[test]
    fn test_byte_offset() {
        let body = b"[\n  {\"id\": 1}\n]";
        assert_eq!(byte_offset(body, 1, 1), 0);
        assert_eq!(byte_offset(body, 2, 3), 4);
        assert_eq!(byte_offset(body, 3, 1), 14);
        assert_eq!(byte_offset(body, 9, 9), body.len());
    }

    #[test]
    fn test_decode_events_reports_offset() {
        let body = b"[{\"id\": \"a\", \"camera\": \"Rua\", \"label\": \"car\", \"start_time\": oops}]";
        let (message, offset) = decode_events(body).unwrap_err();

        assert!(message.contains("line 1"), "{message}");
        assert!(offset > 50 && offset <= body.len(), "offset {offset}");
    }

    #[test]
    fn test_decode_events_ok() {
        let body = br#"[{"id": "a", "camera": "Rua", "label": "car", "start_time": 1.0, "end_time": null}]"#;
        let events = decode_events(body).unwrap();
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_finished());
    }
}
