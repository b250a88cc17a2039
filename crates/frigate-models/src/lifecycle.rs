//! Dedup lifecycle vocabulary: poll modes, keys and stored states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key prefix shared by the in-progress and text watch lifecycles.
pub const WATCHDOG_PREFIX: &str = "WatchDog_";

/// Which poll loop is looking at an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// Finished events with full media, windowed by `before`.
    Default,
    /// Events still being tracked (`in_progress=1`).
    InProgressWatch,
    /// Compact text-only notices for every new event.
    TextWatch,
}

impl PollMode {
    /// All modes, in the order their loops are started.
    pub const ALL: [PollMode; 3] = [
        PollMode::Default,
        PollMode::InProgressWatch,
        PollMode::TextWatch,
    ];

    /// True for the text-only watch loop.
    pub fn watch_text(self) -> bool {
        matches!(self, PollMode::TextWatch)
    }

    /// True for the in-progress watch loop.
    pub fn in_progress_watch(self) -> bool {
        matches!(self, PollMode::InProgressWatch)
    }

    /// Prefix applied to dedup keys tracked by this mode.
    pub fn key_prefix(self) -> &'static str {
        if self.watch_text() || self.in_progress_watch() {
            WATCHDOG_PREFIX
        } else {
            ""
        }
    }

    /// Short name used in logs and error reports.
    pub fn as_str(self) -> &'static str {
        match self {
            PollMode::Default => "default",
            PollMode::InProgressWatch => "in_progress",
            PollMode::TextWatch => "text",
        }
    }
}

impl fmt::Display for PollMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store key for one event in one lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey(String);

impl DedupKey {
    /// Builds the key for `event_id` as tracked by `mode`.
    pub fn new(event_id: &str, mode: PollMode) -> Self {
        Self(format!("{}{}", mode.key_prefix(), event_id))
    }

    /// Returns the raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DedupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Last notification outcome recorded for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// A dispatch is running; short-lived lock.
    InWork,
    /// Announced while the detection was still running.
    InProgress,
    /// Still running and already announced by an overlapping dispatch.
    AlreadyInProgress,
    /// Announced with an end time.
    Finished,
}

impl LifecycleState {
    /// The exact string written to the store.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::InWork => "InWork",
            LifecycleState::InProgress => "InProgress",
            LifecycleState::AlreadyInProgress => "AlreadyInProgress",
            LifecycleState::Finished => "Finished",
        }
    }

    /// Interprets a stored value. Stored values are free-form, so anything
    /// unrecognised yields `None`.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "InWork" => Some(LifecycleState::InWork),
            "InProgress" => Some(LifecycleState::InProgress),
            "AlreadyInProgress" => Some(LifecycleState::AlreadyInProgress),
            "Finished" => Some(LifecycleState::Finished),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
