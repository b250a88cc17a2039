//! Poll loops and supervision of per-event tasks.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, trace, warn};

use frigate_media::MediaChunker;
use frigate_models::{DedupKey, Event, PollMode};
use frigate_store::DedupStore;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::filter::CameraFilter;
use crate::lifecycle::{Decision, LifecycleTracker};
use crate::notifier::{ErrorReporter, Notifier, ALL_EVENTS};
use crate::pipeline::{EventPipeline, PipelineOutcome};
use crate::source::{EventQuery, EventSource};

/// Counters for one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Loop that ran the cycle.
    pub mode: PollMode,
    /// Events returned by the source.
    pub fetched: usize,
    /// Event tasks spawned.
    pub spawned: usize,
    /// Events left alone.
    pub skipped: usize,
    /// The fetch failed and the cycle was abandoned.
    pub source_failed: bool,
}

impl CycleReport {
    fn new(mode: PollMode) -> Self {
        Self {
            mode,
            fetched: 0,
            spawned: 0,
            skipped: 0,
            source_failed: false,
        }
    }
}

/// Result of one finished event task.
#[derive(Debug)]
pub struct TaskReport {
    /// Event the task worked on.
    pub event_id: String,
    /// Pipeline result, or the panic it raised.
    pub result: Result<PipelineOutcome>,
}

struct LoopContext {
    config: Arc<RelayConfig>,
    source: Arc<dyn EventSource>,
    store: Arc<dyn DedupStore>,
    tracker: Arc<LifecycleTracker>,
    pipeline: Arc<EventPipeline>,
    reporter: ErrorReporter,
}

/// One poll loop and the event tasks it spawned.
pub struct PollLoop {
    mode: PollMode,
    context: Arc<LoopContext>,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<TaskReport>,
}

impl PollLoop {
    /// The loop's mode.
    pub fn mode(&self) -> PollMode {
        self.mode
    }

    /// Sleep between cycles.
    pub fn interval(&self) -> Duration {
        match self.mode {
            PollMode::Default => self.context.config.poll_interval,
            PollMode::InProgressWatch | PollMode::TextWatch => self.context.config.watch_interval,
        }
    }

    /// Event tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Runs one fetch, decide and spawn cycle without waiting for the
    /// spawned tasks.
    pub async fn poll_once(&mut self) -> CycleReport {
        let ctx = Arc::clone(&self.context);
        let mut report = CycleReport::new(self.mode);

        if self.mode == PollMode::Default {
            match ctx.store.purge_expired().await {
                Ok(removed) if removed > 0 => trace!(removed, "expired keys purged"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to purge expired keys"),
            }
        }

        let query = EventQuery::for_mode(
            self.mode,
            ctx.config.event_limit,
            ctx.config.event_before,
            Utc::now(),
        );
        let events = match ctx.source.fetch_events(&query).await {
            Ok(events) => events,
            Err(e) => {
                ctx.reporter
                    .report(&format!("Error getting events from Frigate: {}", e), ALL_EVENTS)
                    .await;
                report.source_failed = true;
                return report;
            }
        };
        report.fetched = events.len();

        for event in events {
            match ctx.tracker.claim(&event, self.mode).await {
                Ok(Decision::Notify { key, reason }) => {
                    debug!(
                        event_id = %event.id,
                        camera = %event.camera,
                        mode = ?self.mode,
                        reason = %reason,
                        "dispatching event"
                    );
                    self.spawn(event, key);
                    report.spawned += 1;
                }
                Ok(Decision::Skip(reason)) => {
                    trace!(event_id = %event.id, mode = ?self.mode, reason = %reason, "event skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    ctx.reporter
                        .report(&format!("Error checking event state: {}", e), &event.id)
                        .await;
                    report.skipped += 1;
                }
            }
        }

        report
    }

    fn spawn(&mut self, event: Event, key: DedupKey) {
        let pipeline = Arc::clone(&self.context.pipeline);
        let tracker = Arc::clone(&self.context.tracker);
        let semaphore = Arc::clone(&self.semaphore);
        let mode = self.mode;

        self.tasks.spawn(async move {
            let event_id = event.id.clone();
            // queued events keep their claim until a slot frees up
            let _permit = tracker.hold(&key, semaphore.acquire_owned()).await.ok();
            let result = match AssertUnwindSafe(pipeline.run(event, mode, key))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => Err(RelayError::TaskPanicked(panic_message(panic.as_ref()))),
            };
            TaskReport { event_id, result }
        });
    }

    async fn handle(&self, joined: std::result::Result<TaskReport, JoinError>) -> Option<TaskReport> {
        match joined {
            Ok(report) => {
                match &report.result {
                    Ok(outcome) => trace!(
                        event_id = %report.event_id,
                        state = %outcome.state,
                        "event task finished"
                    ),
                    Err(e) => {
                        self.context
                            .reporter
                            .report(&format!("Event task failed: {}", e), &report.event_id)
                            .await
                    }
                }
                Some(report)
            }
            Err(e) => {
                self.context
                    .reporter
                    .report(&format!("Event task aborted: {}", e), ALL_EVENTS)
                    .await;
                None
            }
        }
    }

    /// Collects tasks that already finished, without waiting.
    pub async fn reap(&mut self) -> Vec<TaskReport> {
        let mut finished = Vec::new();
        while let Some(joined) = self.tasks.try_join_next() {
            if let Some(report) = self.handle(joined).await {
                finished.push(report);
            }
        }
        finished
    }

    /// Waits up to `grace` for every task. Tasks still running afterwards
    /// are detached, not aborted.
    pub async fn drain(&mut self, grace: Duration) -> Vec<TaskReport> {
        let deadline = tokio::time::Instant::now() + grace;
        let mut finished = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, self.tasks.join_next()).await {
                Ok(Some(joined)) => {
                    if let Some(report) = self.handle(joined).await {
                        finished.push(report);
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        mode = ?self.mode,
                        remaining = self.tasks.len(),
                        "grace period elapsed, leaving event tasks running"
                    );
                    self.tasks.detach_all();
                    break;
                }
            }
        }
        finished
    }

    /// Runs cycles until `shutdown` flips to true, then drains.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.interval();
        info!(mode = ?self.mode, interval_ms = interval.as_millis() as u64, "starting poll loop");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.reap().await;
            let report = self.poll_once().await;
            trace!(
                mode = ?self.mode,
                fetched = report.fetched,
                spawned = report.spawned,
                in_flight = self.tasks.len(),
                "poll cycle done"
            );

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!(mode = ?self.mode, "poll loop received shutdown signal");
                        break;
                    }
                }
            }
        }

        let grace = self.context.config.shutdown_grace;
        self.drain(grace).await;
        debug!(mode = ?self.mode, "poll loop stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Owns the poll loops.
pub struct Dispatcher {
    context: Arc<LoopContext>,
    /// Handles of the running loops.
    handles: Vec<JoinHandle<()>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (cloned into every loop).
    shutdown_rx: watch::Receiver<bool>,
    /// Whether the loops are running.
    started: bool,
}

impl Dispatcher {
    /// Wires the tracker and pipeline for `config`.
    ///
    /// Without a chunker, oversized clips are reported and left out.
    pub fn new(
        config: RelayConfig,
        source: Arc<dyn EventSource>,
        store: Arc<dyn DedupStore>,
        notifier: Arc<dyn Notifier>,
        chunker: Option<MediaChunker>,
    ) -> Self {
        let filter = CameraFilter::from_lists(&config.exclude_cameras, &config.include_cameras);
        let tracker = Arc::new(
            LifecycleTracker::new(Arc::clone(&store), filter)
                .with_in_work_ttl(config.in_work_ttl)
                .with_retention_ttl(config.retention_ttl),
        );
        let pipeline = EventPipeline::new(
            &config,
            Arc::clone(&source),
            Arc::clone(&notifier),
            Arc::clone(&tracker),
            chunker,
        );
        Self::with_pipeline(config, source, store, notifier, tracker, pipeline)
    }

    /// Uses an already built tracker and pipeline.
    pub fn with_pipeline(
        config: RelayConfig,
        source: Arc<dyn EventSource>,
        store: Arc<dyn DedupStore>,
        notifier: Arc<dyn Notifier>,
        tracker: Arc<LifecycleTracker>,
        pipeline: EventPipeline,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let context = LoopContext {
            config: Arc::new(config),
            source,
            store,
            tracker,
            pipeline: Arc::new(pipeline),
            reporter: ErrorReporter::new(notifier),
        };

        Self {
            context: Arc::new(context),
            handles: Vec::new(),
            shutdown_tx,
            shutdown_rx,
            started: false,
        }
    }

    /// Modes enabled by the config, default first.
    pub fn modes(&self) -> Vec<PollMode> {
        let config = &self.context.config;
        PollMode::ALL
            .into_iter()
            .filter(|mode| match mode {
                PollMode::Default => true,
                PollMode::InProgressWatch => config.send_in_progress_events,
                PollMode::TextWatch => config.send_text_events,
            })
            .collect()
    }

    /// Creates a standalone loop for `mode` with its own task set.
    pub fn poll_loop(&self, mode: PollMode) -> PollLoop {
        PollLoop {
            mode,
            context: Arc::clone(&self.context),
            semaphore: Arc::new(Semaphore::new(self.context.config.max_concurrent_events)),
            tasks: JoinSet::new(),
        }
    }

    /// The lifecycle tracker shared by all loops.
    pub fn tracker(&self) -> Arc<LifecycleTracker> {
        Arc::clone(&self.context.tracker)
    }

    /// Runs one cycle of every enabled loop and waits for the spawned
    /// tasks, up to the shutdown grace period per loop.
    pub async fn run_once(&self) -> Vec<CycleReport> {
        let grace = self.context.config.shutdown_grace;
        let mut reports = Vec::new();
        for mode in self.modes() {
            let mut poll = self.poll_loop(mode);
            reports.push(poll.poll_once().await);
            poll.drain(grace).await;
        }
        reports
    }

    /// Spawns every enabled loop.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(RelayError::AlreadyStarted);
        }

        let modes = self.modes();
        info!(modes = ?modes, "starting dispatcher");

        for mode in modes {
            let poll = self.poll_loop(mode);
            let shutdown_rx = self.shutdown_rx.clone();
            self.handles.push(tokio::spawn(poll.run(shutdown_rx)));
        }
        self.started = true;

        Ok(())
    }

    /// Stops the loops. In-flight event tasks get the grace period to
    /// finish.
    ///
    /// Every loop is awaited even when one of them failed; the first
    /// failure is returned after the dispatcher is marked stopped.
    pub async fn shutdown(&mut self) -> Result<()> {
        if !self.started {
            return Err(RelayError::NotStarted);
        }

        info!("shutting down dispatcher");

        let mut first_error = None;
        if let Err(e) = self.shutdown_tx.send(true) {
            first_error = Some(RelayError::Shutdown(format!(
                "failed to send shutdown signal: {}",
                e
            )));
        }

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "poll loop did not stop cleanly");
                first_error
                    .get_or_insert_with(|| RelayError::Shutdown(format!("poll loop panicked: {}", e)));
            }
        }

        self.shutdown_tx.send_replace(false);
        self.started = false;

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("dispatcher stopped");
                Ok(())
            }
        }
    }

    /// Check if the loops are running.
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.started {
            let _ = self.shutdown_tx.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingNotifier, StaticSource};
    use async_trait::async_trait;
    use frigate_models::OutboundMessage;
    use frigate_store::MemoryDedupStore;
    use tempfile::TempDir;

    struct Harness {
        source: Arc<StaticSource>,
        store: Arc<MemoryDedupStore>,
        notifier: Arc<RecordingNotifier>,
        _dir: TempDir,
        dispatcher: Dispatcher,
    }

    fn harness(events: Vec<Event>, config: RelayConfig) -> Harness {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(StaticSource::new(events));
        let store = Arc::new(MemoryDedupStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let dispatcher = Dispatcher::new(
            config.with_media_dir(dir.path()),
            source.clone(),
            store.clone(),
            notifier.clone(),
            None,
        );
        Harness {
            source,
            store,
            notifier,
            _dir: dir,
            dispatcher,
        }
    }

    fn abc123() -> Event {
        Event::new("abc123", "Rua", "person", 1_700_000_000.0)
            .with_thumbnail("aGVsbG8=")
            .with_clip(true)
    }

    #[tokio::test]
    async fn test_unfinished_then_finished_default() {
        let h = harness(vec![abc123()], RelayConfig::default());
        h.source.set_clip("abc123", 200, vec![7u8; 32]).await;
        let mut poll = h.dispatcher.poll_loop(PollMode::Default);

        let report = poll.poll_once().await;
        assert_eq!(report.spawned, 0);
        assert_eq!(report.skipped, 1);
        assert!(h.store.is_empty().await);

        h.source
            .set_events(vec![abc123().with_end_time(1_700_000_030.0)])
            .await;
        let report = poll.poll_once().await;
        assert_eq!(report.spawned, 1);

        let done = poll.drain(Duration::from_secs(5)).await;
        assert_eq!(done.len(), 1);
        assert!(done[0].result.is_ok());

        let sent = h.notifier.deliveries().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments.len(), 2);
        assert_eq!(h.store.get("abc123").await.unwrap().as_deref(), Some("Finished"));

        // terminal state: nothing more on re-poll
        let report = poll.poll_once().await;
        assert_eq!(report.spawned, 0);
        poll.drain(Duration::from_secs(5)).await;
        assert_eq!(h.notifier.deliveries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_spawns_once() {
        let event = abc123().with_end_time(1_700_000_030.0).with_clip(false);
        let h = harness(vec![event.clone(), event], RelayConfig::default());
        let mut poll = h.dispatcher.poll_loop(PollMode::Default);

        let report = poll.poll_once().await;
        assert_eq!(report.fetched, 2);
        assert_eq!(report.spawned, 1);
        assert_eq!(report.skipped, 1);

        poll.drain(Duration::from_secs(5)).await;
        assert_eq!(h.notifier.deliveries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_source_failure_reported() {
        let h = harness(vec![abc123()], RelayConfig::default());
        h.source.set_failing(true);
        let mut poll = h.dispatcher.poll_loop(PollMode::Default);

        let report = poll.poll_once().await;

        assert!(report.source_failed);
        let reports = h.notifier.reports().await;
        assert_eq!(reports.len(), 1);
        assert!(reports[0].starts_with("Error getting events from Frigate:"));
        assert!(reports[0].ends_with("\nEventID: ALL"));
    }

    #[tokio::test]
    async fn test_filtered_camera_skipped() {
        let config = RelayConfig::default().with_cameras(vec!["Rua".into()], vec!["All".into()]);
        let h = harness(vec![abc123().with_end_time(1_700_000_030.0)], config);
        let mut poll = h.dispatcher.poll_loop(PollMode::Default);

        let report = poll.poll_once().await;

        assert_eq!(report.spawned, 0);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_watch_queries() {
        let config = RelayConfig::default().with_watch_loops(true, true);
        let h = harness(vec![abc123()], config);

        let reports = h.dispatcher.run_once().await;

        let modes: Vec<_> = reports.iter().map(|r| r.mode).collect();
        assert_eq!(
            modes,
            vec![PollMode::Default, PollMode::InProgressWatch, PollMode::TextWatch]
        );
        assert_eq!(reports[1].spawned, 1);
        // in-progress watch already holds the prefixed key
        assert_eq!(reports[2].spawned, 0);

        let queries = h.source.queries().await;
        assert!(queries[0].before.is_some() && !queries[0].in_progress);
        assert!(queries[1].in_progress && queries[1].before.is_none());
        assert!(!queries[2].in_progress && queries[2].before.is_none());

        assert_eq!(
            h.store.get("WatchDog_abc123").await.unwrap().as_deref(),
            Some("InProgress")
        );
        assert_eq!(h.notifier.deliveries().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_tick_purges_expired_keys() {
        let h = harness(Vec::new(), RelayConfig::default());
        h.store.set("old", "Finished", Duration::from_secs(5)).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(h.store.len().await, 1);

        let mut poll = h.dispatcher.poll_loop(PollMode::Default);
        poll.poll_once().await;

        assert_eq!(h.store.len().await, 0);
    }

    struct PanickingNotifier {
        reports: tokio::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for PanickingNotifier {
        async fn deliver(&self, _message: &OutboundMessage) -> Result<()> {
            panic!("renderer exploded");
        }

        async fn report(&self, text: &str) -> Result<()> {
            self.reports.lock().await.push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_task_panic_is_reported() {
        let dir = TempDir::new().unwrap();
        let notifier = Arc::new(PanickingNotifier {
            reports: tokio::sync::Mutex::new(Vec::new()),
        });
        let event = abc123().with_end_time(1_700_000_030.0).with_clip(false);
        let dispatcher = Dispatcher::new(
            RelayConfig::default().with_media_dir(dir.path()),
            Arc::new(StaticSource::new(vec![event])),
            Arc::new(MemoryDedupStore::new()),
            notifier.clone(),
            None,
        );
        let mut poll = dispatcher.poll_loop(PollMode::Default);

        poll.poll_once().await;
        let done = poll.drain(Duration::from_secs(5)).await;

        assert!(matches!(done[0].result, Err(RelayError::TaskPanicked(ref m)) if m == "renderer exploded"));
        let reports = notifier.reports.lock().await.clone();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].contains("renderer exploded"));
        assert!(reports[0].ends_with("\nEventID: abc123"));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let config = RelayConfig::default()
            .with_intervals(Duration::from_millis(10), Duration::from_millis(10))
            .with_watch_loops(true, false)
            .with_shutdown_grace(Duration::from_secs(1));
        let mut h = harness(vec![abc123().with_clip(false)], config);

        h.dispatcher.start().await.unwrap();
        assert!(h.dispatcher.is_started());
        assert!(matches!(h.dispatcher.start().await, Err(RelayError::AlreadyStarted)));

        tokio::time::sleep(Duration::from_millis(60)).await;
        h.dispatcher.shutdown().await.unwrap();
        assert!(!h.dispatcher.is_started());

        // the text watch announced the event once despite many cycles
        let sent = h.notifier.deliveries().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_text_only());
        assert!(h.source.queries().await.len() >= 4);
    }

    struct SlowNotifier {
        delay: Duration,
        delivered: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Notifier for SlowNotifier {
        async fn deliver(&self, _message: &OutboundMessage) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.delivered.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        async fn report(&self, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_delivery_keeps_queued_events_claimed() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryDedupStore::new());
        let notifier = Arc::new(SlowNotifier {
            delay: Duration::from_secs(90),
            delivered: std::sync::atomic::AtomicUsize::new(0),
        });
        let events = vec![
            Event::new("e1", "Rua", "person", 1_700_000_000.0).with_end_time(1_700_000_030.0),
            Event::new("e2", "Rua", "person", 1_700_000_000.0).with_end_time(1_700_000_030.0),
        ];
        let config = RelayConfig::default()
            .with_media_dir(dir.path())
            .with_max_concurrent_events(1)
            .with_shutdown_grace(Duration::from_secs(600));
        let dispatcher = Dispatcher::new(
            config,
            Arc::new(StaticSource::new(events)),
            store.clone(),
            notifier.clone(),
            None,
        );
        let mut poll = dispatcher.poll_loop(PollMode::Default);

        assert_eq!(poll.poll_once().await.spawned, 2);
        tokio::task::yield_now().await;

        // both markers would have lapsed at 60 s without a refresh
        for step in [30, 35] {
            tokio::time::advance(Duration::from_secs(step)).await;
            assert_eq!(poll.poll_once().await.spawned, 0);
        }

        let done = poll.drain(Duration::from_secs(600)).await;
        assert_eq!(done.len(), 2);
        assert_eq!(notifier.delivered.load(std::sync::atomic::Ordering::SeqCst), 2);
        for id in ["e1", "e2"] {
            assert_eq!(store.get(id).await.unwrap().as_deref(), Some("Finished"));
        }
    }

    struct ReportPanickingNotifier;

    #[async_trait]
    impl Notifier for ReportPanickingNotifier {
        async fn deliver(&self, _message: &OutboundMessage) -> Result<()> {
            Ok(())
        }

        async fn report(&self, _text: &str) -> Result<()> {
            panic!("operator chat gone");
        }
    }

    #[tokio::test]
    async fn test_shutdown_awaits_every_loop() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(StaticSource::new(Vec::new()));
        source.set_failing(true);
        let config = RelayConfig::default()
            .with_media_dir(dir.path())
            .with_watch_loops(true, true);
        let mut dispatcher = Dispatcher::new(
            config,
            source,
            Arc::new(MemoryDedupStore::new()),
            Arc::new(ReportPanickingNotifier),
            None,
        );

        dispatcher.start().await.unwrap();
        // let every loop reach its first failing report
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = dispatcher.shutdown().await;

        assert!(matches!(result, Err(RelayError::Shutdown(ref m)) if m.contains("poll loop panicked")));
        assert!(!dispatcher.is_started());
        assert!(dispatcher.handles.is_empty());
        // the dispatcher is reset and can be started again
        dispatcher.start().await.unwrap();
        assert!(dispatcher.is_started());
    }

    #[tokio::test]
    async fn test_shutdown_before_start() {
        let mut h = harness(Vec::new(), RelayConfig::default());
        assert!(matches!(h.dispatcher.shutdown().await, Err(RelayError::NotStarted)));
    }
}
