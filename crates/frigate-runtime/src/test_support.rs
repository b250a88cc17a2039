//! Fakes shared by the unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use frigate_models::{Event, OutboundMessage};

use crate::error::{RelayError, Result};
use crate::notifier::Notifier;
use crate::source::{ClipDownload, EventQuery, EventSource};

/// Records deliveries and reports.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<OutboundMessage>>,
    files: Mutex<Vec<(PathBuf, u64)>>,
    reports: Mutex<Vec<String>>,
    fail_delivery: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail_delivery.store(true, Ordering::SeqCst);
        notifier
    }

    pub async fn deliveries(&self) -> Vec<OutboundMessage> {
        self.delivered.lock().await.clone()
    }

    /// Attachment paths with their size at delivery time.
    pub async fn files(&self) -> Vec<(PathBuf, u64)> {
        self.files.lock().await.clone()
    }

    pub async fn reports(&self) -> Vec<String> {
        self.reports.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        if self.fail_delivery.load(Ordering::SeqCst) {
            return Err(RelayError::Delivery("chat unavailable".into()));
        }
        let mut files = self.files.lock().await;
        for attachment in &message.attachments {
            let size = std::fs::metadata(&attachment.path)?.len();
            files.push((attachment.path.clone(), size));
        }
        self.delivered.lock().await.push(message.clone());
        Ok(())
    }

    async fn report(&self, text: &str) -> Result<()> {
        self.reports.lock().await.push(text.to_string());
        Ok(())
    }
}

/// Serves a fixed event list and canned clips.
#[derive(Default)]
pub struct StaticSource {
    events: Mutex<Vec<Event>>,
    clips: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    queries: Mutex<Vec<EventQuery>>,
    failing: AtomicBool,
}

impl StaticSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: Mutex::new(events),
            ..Self::default()
        }
    }

    pub async fn set_events(&self, events: Vec<Event>) {
        *self.events.lock().await = events;
    }

    pub async fn set_clip(&self, event_id: &str, status: u16, body: Vec<u8>) {
        self.clips
            .lock()
            .await
            .insert(event_id.to_string(), (status, body));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn queries(&self) -> Vec<EventQuery> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl EventSource for StaticSource {
    async fn fetch_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        self.queries.lock().await.push(query.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::Status {
                url: "http://fake/api/events".into(),
                status: 500,
            });
        }
        Ok(self.events.lock().await.clone())
    }

    async fn fetch_clip(&self, event_id: &str, dest: &Path) -> Result<ClipDownload> {
        let (status, body) = self
            .clips
            .lock()
            .await
            .get(event_id)
            .cloned()
            .unwrap_or((404, Vec::new()));
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &body).await?;
        Ok(ClipDownload {
            status,
            bytes: body.len() as u64,
        })
    }
}
