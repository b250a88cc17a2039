//! Dedup state machine deciding which events get notified.
//!
//! Every polled event is checked in this order:
//! 1. Camera filter (exclude, then include)
//! 2. Key presence in the dedup store
//! 3. Completion, depending on the poll mode
//!
//! A positive decision is followed by an `InWork` marker with a short TTL,
//! refreshed while the event waits for a task slot or is being delivered.
//! Once delivery finishes the key is rewritten with its terminal state and
//! the retention TTL.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use frigate_models::{DedupKey, Event, LifecycleState, PollMode};
use frigate_store::DedupStore;

use crate::error::Result;
use crate::filter::CameraFilter;

/// Why an event is being notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireReason {
    /// The key has never been seen.
    FirstSeen,
    /// Seen by the in-progress watch only after it already ended.
    FinishedBeforeAnnounced,
}

impl fmt::Display for FireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FireReason::FirstSeen => f.write_str("first seen"),
            FireReason::FinishedBeforeAnnounced => f.write_str("finished before announced"),
        }
    }
}

/// Why an event is left alone this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The camera is filtered out.
    Filtered,
    /// The key already exists in the store.
    AlreadyTracked,
    /// Default mode waits for the end time.
    Unfinished,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Filtered => f.write_str("camera filtered"),
            SkipReason::AlreadyTracked => f.write_str("already tracked"),
            SkipReason::Unfinished => f.write_str("not finished"),
        }
    }
}

/// Outcome of evaluating one event in one poll mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Send a notification and track it under `key`.
    Notify { key: DedupKey, reason: FireReason },
    /// Do nothing.
    Skip(SkipReason),
}

impl Decision {
    /// Returns true for `Decision::Notify`.
    pub fn is_notify(&self) -> bool {
        matches!(self, Decision::Notify { .. })
    }
}

/// Pure decision step, given the filter verdict and key presence.
pub fn decide(event: &Event, mode: PollMode, camera_allowed: bool, key_exists: bool) -> Decision {
    if !camera_allowed {
        return Decision::Skip(SkipReason::Filtered);
    }
    if key_exists {
        return Decision::Skip(SkipReason::AlreadyTracked);
    }

    let reason = if mode.in_progress_watch() && event.is_finished() {
        FireReason::FinishedBeforeAnnounced
    } else if mode == PollMode::Default && !event.is_finished() {
        return Decision::Skip(SkipReason::Unfinished);
    } else {
        FireReason::FirstSeen
    };

    Decision::Notify {
        key: DedupKey::new(&event.id, mode),
        reason,
    }
}

/// State written once delivery for a key has finished.
///
/// `current` is the recognised value held by the key at write time.
pub fn terminal_state(
    finished: bool,
    mode: PollMode,
    current: Option<LifecycleState>,
) -> LifecycleState {
    if finished {
        LifecycleState::Finished
    } else if mode.in_progress_watch() && current == Some(LifecycleState::InProgress) {
        LifecycleState::AlreadyInProgress
    } else {
        LifecycleState::InProgress
    }
}

/// Applies decisions against a shared dedup store.
pub struct LifecycleTracker {
    store: Arc<dyn DedupStore>,
    filter: CameraFilter,
    in_work_ttl: Duration,
    retention_ttl: Duration,
}

impl LifecycleTracker {
    /// Creates a tracker with a 60 s `InWork` TTL and a 14 day retention.
    pub fn new(store: Arc<dyn DedupStore>, filter: CameraFilter) -> Self {
        Self {
            store,
            filter,
            in_work_ttl: Duration::from_secs(60),
            retention_ttl: Duration::from_secs(1_209_600),
        }
    }

    /// Sets the TTL of the `InWork` marker.
    pub fn with_in_work_ttl(mut self, ttl: Duration) -> Self {
        self.in_work_ttl = ttl;
        self
    }

    /// Sets the TTL of terminal states.
    pub fn with_retention_ttl(mut self, ttl: Duration) -> Self {
        self.retention_ttl = ttl;
        self
    }

    /// The camera filter in use.
    pub fn filter(&self) -> &CameraFilter {
        &self.filter
    }

    /// The backing store.
    pub fn store(&self) -> Arc<dyn DedupStore> {
        Arc::clone(&self.store)
    }

    /// Decides whether `event` should be notified in `mode`.
    ///
    /// Filtered events never touch the store.
    pub async fn evaluate(&self, event: &Event, mode: PollMode) -> Result<Decision> {
        if !self.filter.matches(event) {
            return Ok(decide(event, mode, false, false));
        }
        let key = DedupKey::new(&event.id, mode);
        let exists = self.store.exists(key.as_str()).await?;
        Ok(decide(event, mode, true, exists))
    }

    /// Writes the `InWork` marker for `key`.
    pub async fn begin(&self, key: &DedupKey) -> Result<()> {
        self.store
            .set(key.as_str(), LifecycleState::InWork.as_str(), self.in_work_ttl)
            .await?;
        trace!(key = %key, "marked in work");
        Ok(())
    }

    /// Drives `work` to completion while rewriting the `InWork` marker for
    /// `key` every half TTL, so the key stays claimed however long `work`
    /// takes.
    ///
    /// Refresh failures are logged; the marker then lapses as it would
    /// without a refresh.
    pub async fn hold<F: Future>(&self, key: &DedupKey, work: F) -> F::Output {
        let period = (self.in_work_ttl / 2).max(Duration::from_millis(1));
        let mut refresh = interval_at(Instant::now() + period, period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(work);

        loop {
            tokio::select! {
                biased;
                output = &mut work => return output,
                _ = refresh.tick() => {
                    if let Err(e) = self.begin(key).await {
                        warn!(key = %key, error = %e, "failed to refresh in-work marker");
                    }
                }
            }
        }
    }

    /// Evaluates `event` and, on a positive decision, writes `InWork`
    /// before returning.
    pub async fn claim(&self, event: &Event, mode: PollMode) -> Result<Decision> {
        let decision = self.evaluate(event, mode).await?;
        if let Decision::Notify { ref key, .. } = decision {
            self.begin(key).await?;
        }
        Ok(decision)
    }

    /// Writes the terminal state for `key` and returns it.
    pub async fn complete(
        &self,
        key: &DedupKey,
        event: &Event,
        mode: PollMode,
    ) -> Result<LifecycleState> {
        let current = self
            .store
            .get(key.as_str())
            .await?
            .as_deref()
            .and_then(LifecycleState::from_stored);
        let state = terminal_state(event.is_finished(), mode, current);

        self.store
            .set(key.as_str(), state.as_str(), self.retention_ttl)
            .await?;

        debug!(
            event_id = %event.id,
            key = %key,
            state = %state,
            ttl_secs = self.retention_ttl.as_secs(),
            "lifecycle state written"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frigate_store::MemoryDedupStore;

    fn unfinished() -> Event {
        Event::new("abc123", "Rua", "person", 1_700_000_000.0)
    }

    fn finished() -> Event {
        unfinished().with_end_time(1_700_000_030.0)
    }

    fn tracker(store: Arc<MemoryDedupStore>) -> LifecycleTracker {
        LifecycleTracker::new(store, CameraFilter::new())
    }

    #[test]
    fn test_decide_filtered_first() {
        let d = decide(&finished(), PollMode::Default, false, false);
        assert_eq!(d, Decision::Skip(SkipReason::Filtered));
    }

    #[test]
    fn test_decide_existing_key() {
        for mode in PollMode::ALL {
            let d = decide(&finished(), mode, true, true);
            assert_eq!(d, Decision::Skip(SkipReason::AlreadyTracked), "{mode}");
        }
    }

    #[test]
    fn test_decide_default_mode() {
        assert_eq!(
            decide(&unfinished(), PollMode::Default, true, false),
            Decision::Skip(SkipReason::Unfinished)
        );
        assert_eq!(
            decide(&finished(), PollMode::Default, true, false),
            Decision::Notify {
                key: DedupKey::new("abc123", PollMode::Default),
                reason: FireReason::FirstSeen,
            }
        );
    }

    #[test]
    fn test_decide_in_progress_watch() {
        let d = decide(&unfinished(), PollMode::InProgressWatch, true, false);
        assert!(matches!(
            d,
            Decision::Notify { ref key, reason: FireReason::FirstSeen } if key.as_str() == "WatchDog_abc123"
        ));

        let d = decide(&finished(), PollMode::InProgressWatch, true, false);
        assert!(matches!(
            d,
            Decision::Notify { reason: FireReason::FinishedBeforeAnnounced, .. }
        ));
    }

    #[test]
    fn test_decide_text_watch_ignores_completion() {
        for event in [unfinished(), finished()] {
            let d = decide(&event, PollMode::TextWatch, true, false);
            assert!(matches!(d, Decision::Notify { reason: FireReason::FirstSeen, .. }));
        }
    }

    #[test]
    fn test_terminal_state() {
        assert_eq!(
            terminal_state(true, PollMode::Default, Some(LifecycleState::InWork)),
            LifecycleState::Finished
        );
        assert_eq!(
            terminal_state(false, PollMode::InProgressWatch, Some(LifecycleState::InWork)),
            LifecycleState::InProgress
        );
        assert_eq!(
            terminal_state(false, PollMode::InProgressWatch, Some(LifecycleState::InProgress)),
            LifecycleState::AlreadyInProgress
        );
        assert_eq!(
            terminal_state(false, PollMode::TextWatch, Some(LifecycleState::InProgress)),
            LifecycleState::InProgress
        );
        assert_eq!(
            terminal_state(true, PollMode::InProgressWatch, Some(LifecycleState::InProgress)),
            LifecycleState::Finished
        );
    }

    #[tokio::test]
    async fn test_unfinished_default_writes_nothing() {
        let store = Arc::new(MemoryDedupStore::new());
        let tracker = tracker(Arc::clone(&store));

        let d = tracker.claim(&unfinished(), PollMode::Default).await.unwrap();

        assert_eq!(d, Decision::Skip(SkipReason::Unfinished));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_claim_then_complete() {
        let store = Arc::new(MemoryDedupStore::new());
        let tracker = tracker(Arc::clone(&store));
        let event = finished();

        let d = tracker.claim(&event, PollMode::Default).await.unwrap();
        let Decision::Notify { key, .. } = d else {
            panic!("expected notify, got {d:?}");
        };
        assert_eq!(store.get("abc123").await.unwrap().as_deref(), Some("InWork"));

        // same id again within the tick
        let again = tracker.claim(&event, PollMode::Default).await.unwrap();
        assert_eq!(again, Decision::Skip(SkipReason::AlreadyTracked));

        let state = tracker.complete(&key, &event, PollMode::Default).await.unwrap();
        assert_eq!(state, LifecycleState::Finished);
        assert_eq!(store.get("abc123").await.unwrap().as_deref(), Some("Finished"));
    }

    #[tokio::test]
    async fn test_filtered_event_never_reads_store() {
        let store = Arc::new(MemoryDedupStore::new());
        let tracker = LifecycleTracker::new(
            Arc::clone(&store) as Arc<dyn DedupStore>,
            CameraFilter::new().with_exclude(["Rua"]),
        );

        let d = tracker.claim(&finished(), PollMode::Default).await.unwrap();

        assert_eq!(d, Decision::Skip(SkipReason::Filtered));
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_work_expires_and_retention_holds() {
        let store = Arc::new(MemoryDedupStore::new());
        let tracker = tracker(Arc::clone(&store)).with_retention_ttl(Duration::from_secs(3600));
        let event = unfinished();

        let d = tracker.claim(&event, PollMode::InProgressWatch).await.unwrap();
        assert!(d.is_notify());

        tokio::time::advance(Duration::from_secs(61)).await;
        // the marker lapsed, so the key can be claimed again
        assert!(tracker.claim(&event, PollMode::InProgressWatch).await.unwrap().is_notify());

        let key = DedupKey::new(&event.id, PollMode::InProgressWatch);
        tracker.complete(&key, &event, PollMode::InProgressWatch).await.unwrap();

        tokio::time::advance(Duration::from_secs(3000)).await;
        assert!(!tracker.claim(&event, PollMode::InProgressWatch).await.unwrap().is_notify());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_keeps_marker_alive() {
        let store = Arc::new(MemoryDedupStore::new());
        let tracker = tracker(Arc::clone(&store)).with_in_work_ttl(Duration::from_secs(10));
        let key = DedupKey::new("abc123", PollMode::Default);
        tracker.begin(&key).await.unwrap();

        let output = tracker
            .hold(&key, async {
                tokio::time::sleep(Duration::from_secs(25)).await;
                7
            })
            .await;

        assert_eq!(output, 7);
        assert_eq!(store.get("abc123").await.unwrap().as_deref(), Some("InWork"));

        // no refresh once the work is done
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!store.exists("abc123").await.unwrap());
    }

    #[tokio::test]
    async fn test_overlapping_in_progress_dispatch() {
        let store = Arc::new(MemoryDedupStore::new());
        let tracker = tracker(Arc::clone(&store));
        let event = unfinished();
        let key = DedupKey::new(&event.id, PollMode::InProgressWatch);

        let first = tracker.complete(&key, &event, PollMode::InProgressWatch).await.unwrap();
        let second = tracker.complete(&key, &event, PollMode::InProgressWatch).await.unwrap();

        assert_eq!(first, LifecycleState::InProgress);
        assert_eq!(second, LifecycleState::AlreadyInProgress);
    }

    #[tokio::test]
    async fn test_modes_use_separate_keys() {
        let store = Arc::new(MemoryDedupStore::new());
        let tracker = tracker(Arc::clone(&store));
        let event = finished();

        assert!(tracker.claim(&event, PollMode::TextWatch).await.unwrap().is_notify());
        // text and in-progress watch share the prefixed key
        assert!(!tracker.claim(&event, PollMode::InProgressWatch).await.unwrap().is_notify());
        assert!(tracker.claim(&event, PollMode::Default).await.unwrap().is_notify());
    }
}
