//! Per-event notification work.
//!
//! One run covers, strictly in order: thumbnail decode, body rendering,
//! clip download, chunking of oversized clips, delivery and the terminal
//! lifecycle write. Scratch files live until delivery has finished.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use frigate_media::{
    clip_path, save_thumbnail, ChunkOptions, MediaChunker, MediaPart, TempFiles,
};
use frigate_models::{Attachment, DedupKey, Event, LifecycleState, OutboundMessage, PollMode};

use crate::config::{RelayConfig, ThreadTable};
use crate::error::Result;
use crate::format::{part_caption, MessageFormatter};
use crate::lifecycle::LifecycleTracker;
use crate::notifier::{ErrorReporter, Notifier};
use crate::source::EventSource;

/// What one pipeline run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// State written for the key.
    pub state: LifecycleState,
    /// Messages accepted by the notifier.
    pub delivered: usize,
    /// Messages the notifier rejected.
    pub failed: usize,
}

enum ClipMedia {
    Single(PathBuf),
    Parts(Vec<MediaPart>),
}

/// Builds and delivers the notification for one event.
pub struct EventPipeline {
    source: Arc<dyn EventSource>,
    notifier: Arc<dyn Notifier>,
    tracker: Arc<LifecycleTracker>,
    chunker: Option<MediaChunker>,
    formatter: MessageFormatter,
    threads: ThreadTable,
    reporter: ErrorReporter,
    media_dir: PathBuf,
    clip_max_bytes: u64,
    clip_part_bytes: u64,
}

impl EventPipeline {
    /// Creates a pipeline. Without a chunker, oversized clips are reported
    /// and left out.
    pub fn new(
        config: &RelayConfig,
        source: Arc<dyn EventSource>,
        notifier: Arc<dyn Notifier>,
        tracker: Arc<LifecycleTracker>,
        chunker: Option<MediaChunker>,
    ) -> Self {
        Self {
            source,
            reporter: ErrorReporter::new(Arc::clone(&notifier)),
            notifier,
            tracker,
            chunker,
            formatter: MessageFormatter::from_config(config),
            threads: config.threads.clone(),
            media_dir: config.media_dir.clone(),
            clip_max_bytes: config.clip_max_bytes,
            clip_part_bytes: config.clip_part_bytes,
        }
    }

    /// Notifies `event` as seen by `mode` and records the outcome under
    /// `key`.
    ///
    /// Delivery failures are reported and do not stop the terminal write;
    /// only a store failure makes the run fail.
    pub async fn run(&self, event: Event, mode: PollMode, key: DedupKey) -> Result<PipelineOutcome> {
        let (delivered, failed) = self
            .tracker
            .hold(&key, self.notify(&event, mode, &key))
            .await;

        let state = self.tracker.complete(&key, &event, mode).await?;

        info!(
            event_id = %event.id,
            camera = %event.camera,
            mode = ?mode,
            state = %state,
            delivered,
            failed,
            "event notified"
        );

        Ok(PipelineOutcome {
            state,
            delivered,
            failed,
        })
    }

    async fn notify(&self, event: &Event, mode: PollMode, key: &DedupKey) -> (usize, usize) {
        let thread_id = self.threads.thread_for(&event.camera);
        let mut scratch = TempFiles::new();

        let messages = if mode.watch_text() {
            vec![OutboundMessage::text(thread_id, self.formatter.text_notice(event))]
        } else {
            self.compose_media(event, key, thread_id, &mut scratch).await
        };

        let mut delivered = 0;
        let mut failed = 0;
        for message in &messages {
            match self.notifier.deliver(message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    self.reporter
                        .report(&format!("Error sending message: {}", e), &event.id)
                        .await;
                }
            }
        }
        drop(scratch);
        (delivered, failed)
    }

    async fn compose_media(
        &self,
        event: &Event,
        key: &DedupKey,
        thread_id: i32,
        scratch: &mut TempFiles,
    ) -> Vec<OutboundMessage> {
        let mut attachments = Vec::new();

        if let Some(ref encoded) = event.thumbnail {
            match save_thumbnail(&self.media_dir, key.as_str(), encoded).await {
                Ok(path) => {
                    scratch.track(&path);
                    attachments.push(Attachment::photo(path));
                }
                Err(e) => {
                    self.reporter
                        .report(&format!("Error saving thumbnail: {}", e), &event.id)
                        .await;
                }
            }
        }

        let body = self.formatter.event_body(event);

        let mut parts = Vec::new();
        if event.has_clip && event.is_finished() {
            match self.prepare_clip(event, key, scratch).await {
                Some(ClipMedia::Single(path)) => attachments.push(Attachment::video(path)),
                Some(ClipMedia::Parts(chunks)) => parts = chunks,
                None => {}
            }
        }

        let mut messages = Vec::with_capacity(1 + parts.len());
        messages.push(if attachments.is_empty() {
            OutboundMessage::text(thread_id, body)
        } else {
            OutboundMessage::media(thread_id, Some(body), attachments)
        });

        let total = parts.len();
        for part in parts {
            let caption = part_caption(part.index, total);
            messages.push(OutboundMessage::media(
                thread_id,
                None,
                vec![Attachment::video(part.path).with_caption(caption)],
            ));
        }
        messages
    }

    async fn prepare_clip(
        &self,
        event: &Event,
        key: &DedupKey,
        scratch: &mut TempFiles,
    ) -> Option<ClipMedia> {
        let path = clip_path(&self.media_dir, key.as_str());
        scratch.track(&path);

        let download = match self.source.fetch_clip(&event.id, &path).await {
            Ok(download) => download,
            Err(e) => {
                self.reporter
                    .report(&format!("Error clip download: {}", e), &event.id)
                    .await;
                return None;
            }
        };

        if !download.is_ok() {
            self.reporter
                .report(&format!("Return bad status: {}", download.status), &event.id)
                .await;
        }
        if download.bytes == 0 {
            debug!(event_id = %event.id, "empty clip skipped");
            return None;
        }
        if download.bytes <= self.clip_max_bytes {
            return Some(ClipMedia::Single(path));
        }

        let Some(ref chunker) = self.chunker else {
            warn!(event_id = %event.id, size = download.bytes, "clip too large and chunking unavailable");
            self.reporter
                .report(
                    &format!(
                        "Clip is {} bytes, above the {} byte limit, and ffmpeg is not available",
                        download.bytes, self.clip_max_bytes
                    ),
                    &event.id,
                )
                .await;
            return None;
        };

        let options = ChunkOptions::default()
            .with_max_size_bytes(self.clip_part_bytes)
            .with_output_dir(&self.media_dir);

        match chunker.split(&path, &options).await {
            Ok(parts) => {
                for part in &parts {
                    scratch.track(&part.path);
                }
                Some(ClipMedia::Parts(parts))
            }
            Err(e) => {
                self.reporter
                    .report(&format!("Error splitting video: {}", e), &event.id)
                    .await;
                None
            }
        }
    }
}
