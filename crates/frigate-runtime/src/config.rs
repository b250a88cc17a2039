//! Relay configuration.
//!
//! Values come from environment variables (after `.env` loading in the
//! binary). Every setting has a default except `FRIGATE_URL`.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RelayError, Result};

/// Variable holding the camera to thread table.
pub const THREADS_ENV: &str = "TELEGRAM_CAMERA_THREADS";

/// Longest retention accepted for terminal states, one year.
pub const MAX_RETENTION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Immutable camera name to chat thread mapping.
///
/// Cameras without an entry route to thread 0, the chat's main thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadTable {
    threads: HashMap<String, i32>,
}

impl ThreadTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `Camera=threadId` pairs separated by commas.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::InvalidEnv` for entries without `=` or with a
    /// non-numeric thread id.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut threads = HashMap::new();
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (camera, id) = entry
                .split_once('=')
                .ok_or_else(|| invalid(THREADS_ENV, entry, "expected Camera=threadId"))?;
            let id: i32 = id
                .trim()
                .parse()
                .map_err(|e| invalid(THREADS_ENV, entry, e))?;
            threads.insert(camera.trim().to_string(), id);
        }
        Ok(Self { threads })
    }

    /// Adds or replaces one mapping.
    pub fn with_thread(mut self, camera: impl Into<String>, thread_id: i32) -> Self {
        self.threads.insert(camera.into(), thread_id);
        self
    }

    /// Thread for `camera`, 0 when unmapped.
    pub fn thread_for(&self, camera: &str) -> i32 {
        self.threads.get(camera).copied().unwrap_or(0)
    }

    /// Number of mapped cameras.
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Returns true if no camera is mapped.
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

impl FromIterator<(String, i32)> for ThreadTable {
    fn from_iter<I: IntoIterator<Item = (String, i32)>>(iter: I) -> Self {
        Self {
            threads: iter.into_iter().collect(),
        }
    }
}

/// Configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the Frigate API as reachable from the relay.
    pub frigate_url: String,
    /// Base URL used for links inside messages.
    pub external_url: String,
    /// `limit` sent with every events query.
    pub event_limit: u32,
    /// Cameras dropped before any other check.
    pub exclude_cameras: Vec<String>,
    /// Cameras allowed through; the `All` sentinel allows every camera.
    pub include_cameras: Vec<String>,
    /// How far back the default loop's `before` bound sits.
    pub event_before: Duration,
    /// Sleep between default loop cycles.
    pub poll_interval: Duration,
    /// Sleep between watch loop cycles.
    pub watch_interval: Duration,
    /// Run the text-only watch loop.
    pub send_text_events: bool,
    /// Run the in-progress watch loop.
    pub send_in_progress_events: bool,
    /// Use compact message bodies.
    pub small_events: bool,
    /// Render event times in UTC instead of local time.
    pub utc_times: bool,
    /// How long terminal states are kept.
    pub retention_ttl: Duration,
    /// How long the `InWork` marker is kept.
    pub in_work_ttl: Duration,
    /// Largest clip sent as a single attachment.
    pub clip_max_bytes: u64,
    /// Size budget for each chunked part.
    pub clip_part_bytes: u64,
    /// Directory for thumbnails, clips and parts.
    pub media_dir: PathBuf,
    /// Per-loop bound on concurrently running event tasks.
    pub max_concurrent_events: usize,
    /// How long shutdown waits for in-flight event tasks.
    pub shutdown_grace: Duration,
    /// Camera to thread routing.
    pub threads: ThreadTable,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            frigate_url: "http://localhost:5000".to_string(),
            external_url: "http://localhost:5000".to_string(),
            event_limit: 20,
            exclude_cameras: vec!["None".to_string()],
            include_cameras: vec!["All".to_string()],
            event_before: Duration::from_secs(300),
            poll_interval: Duration::from_secs(30),
            watch_interval: Duration::from_secs(3),
            send_text_events: false,
            send_in_progress_events: false,
            small_events: false,
            utc_times: false,
            retention_ttl: Duration::from_secs(1_209_600),
            in_work_ttl: Duration::from_secs(60),
            clip_max_bytes: 50 * 1024 * 1024,
            clip_part_bytes: 49 * 1024 * 1024,
            media_dir: std::env::temp_dir(),
            max_concurrent_events: 8,
            shutdown_grace: Duration::from_secs(30),
            threads: ThreadTable::default(),
        }
    }
}

impl RelayConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the config through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let frigate_url = var("FRIGATE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .ok_or_else(|| RelayError::MissingEnv("FRIGATE_URL".to_string()))?;
        let external_url = var("FRIGATE_EXTERNAL_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| frigate_url.clone());

        let (ttl_name, ttl_value) = match var("DEDUP_TTL") {
            Some(v) => ("DEDUP_TTL", Some(v)),
            None => ("REDIS_TTL", var("REDIS_TTL")),
        };

        let config = Self {
            frigate_url,
            external_url,
            event_limit: parse_or("FRIGATE_EVENT_LIMIT", var("FRIGATE_EVENT_LIMIT"), defaults.event_limit)?,
            exclude_cameras: var("FRIGATE_EXCLUDE_CAMERA")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.exclude_cameras),
            include_cameras: var("FRIGATE_INCLUDE_CAMERA")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.include_cameras),
            event_before: secs_or("EVENT_BEFORE_SECONDS", var("EVENT_BEFORE_SECONDS"), defaults.event_before)?,
            poll_interval: secs_or("SLEEP_TIME", var("SLEEP_TIME"), defaults.poll_interval)?,
            watch_interval: secs_or("WATCH_DOG_SLEEP_TIME", var("WATCH_DOG_SLEEP_TIME"), defaults.watch_interval)?,
            send_text_events: bool_or("SEND_TEXT_EVENT", var("SEND_TEXT_EVENT"), defaults.send_text_events)?,
            send_in_progress_events: bool_or(
                "SEND_IN_PROGRESS_EVENT",
                var("SEND_IN_PROGRESS_EVENT"),
                defaults.send_in_progress_events,
            )?,
            small_events: bool_or("SMALL_EVENT", var("SMALL_EVENT"), defaults.small_events)?,
            utc_times: bool_or("UTC_TIMES", var("UTC_TIMES"), defaults.utc_times)?,
            retention_ttl: secs_or(ttl_name, ttl_value, defaults.retention_ttl)?,
            in_work_ttl: defaults.in_work_ttl,
            clip_max_bytes: parse_or("CLIP_MAX_BYTES", var("CLIP_MAX_BYTES"), defaults.clip_max_bytes)?,
            clip_part_bytes: parse_or("CLIP_PART_BYTES", var("CLIP_PART_BYTES"), defaults.clip_part_bytes)?,
            media_dir: var("MEDIA_DIR").map(PathBuf::from).unwrap_or(defaults.media_dir),
            max_concurrent_events: parse_or(
                "MAX_CONCURRENT_EVENTS",
                var("MAX_CONCURRENT_EVENTS"),
                defaults.max_concurrent_events,
            )?,
            shutdown_grace: defaults.shutdown_grace,
            threads: match var(THREADS_ENV) {
                Some(spec) => ThreadTable::parse(&spec)?,
                None => defaults.threads,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants between settings.
    pub fn validate(&self) -> Result<()> {
        if self.event_limit == 0 {
            return Err(invalid("FRIGATE_EVENT_LIMIT", "0", "must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("SLEEP_TIME", "0", "must be positive"));
        }
        if self.watch_interval.is_zero() {
            return Err(invalid("WATCH_DOG_SLEEP_TIME", "0", "must be positive"));
        }
        if self.retention_ttl.is_zero() {
            return Err(invalid("DEDUP_TTL", "0", "must be positive"));
        }
        if self.retention_ttl > MAX_RETENTION_TTL {
            return Err(invalid(
                "DEDUP_TTL",
                self.retention_ttl.as_secs().to_string(),
                format!("must be at most {} seconds", MAX_RETENTION_TTL.as_secs()),
            ));
        }
        if self.max_concurrent_events == 0 {
            return Err(invalid("MAX_CONCURRENT_EVENTS", "0", "must be positive"));
        }
        if self.clip_part_bytes == 0 || self.clip_part_bytes > self.clip_max_bytes {
            return Err(invalid(
                "CLIP_PART_BYTES",
                self.clip_part_bytes.to_string(),
                format!("must be between 1 and CLIP_MAX_BYTES ({})", self.clip_max_bytes),
            ));
        }
        Ok(())
    }

    /// Sets the Frigate base URL, also used for links.
    pub fn with_frigate_url(mut self, url: impl Into<String>) -> Self {
        self.frigate_url = url.into();
        self.external_url = self.frigate_url.clone();
        self
    }

    /// Sets the base URL used for links.
    pub fn with_external_url(mut self, url: impl Into<String>) -> Self {
        self.external_url = url.into();
        self
    }

    /// Sets the exclude and include camera lists.
    pub fn with_cameras(mut self, exclude: Vec<String>, include: Vec<String>) -> Self {
        self.exclude_cameras = exclude;
        self.include_cameras = include;
        self
    }

    /// Sets both loop intervals.
    pub fn with_intervals(mut self, poll: Duration, watch: Duration) -> Self {
        self.poll_interval = poll;
        self.watch_interval = watch;
        self
    }

    /// Enables or disables the watch loops.
    pub fn with_watch_loops(mut self, text: bool, in_progress: bool) -> Self {
        self.send_text_events = text;
        self.send_in_progress_events = in_progress;
        self
    }

    /// Selects compact message bodies.
    pub fn with_small_events(mut self, small: bool) -> Self {
        self.small_events = small;
        self
    }

    /// Renders event times in UTC.
    pub fn with_utc_times(mut self, utc: bool) -> Self {
        self.utc_times = utc;
        self
    }

    /// Sets the retention TTL for terminal states.
    pub fn with_retention_ttl(mut self, ttl: Duration) -> Self {
        self.retention_ttl = ttl;
        self
    }

    /// Sets the single-attachment ceiling and the per-part budget.
    pub fn with_clip_limits(mut self, max_bytes: u64, part_bytes: u64) -> Self {
        self.clip_max_bytes = max_bytes;
        self.clip_part_bytes = part_bytes;
        self
    }

    /// Sets the media scratch directory.
    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = dir.into();
        self
    }

    /// Sets the per-loop task bound.
    pub fn with_max_concurrent_events(mut self, max: usize) -> Self {
        self.max_concurrent_events = max;
        self
    }

    /// Sets the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Sets the camera routing table.
    pub fn with_threads(mut self, threads: ThreadTable) -> Self {
        self.threads = threads;
        self
    }
}

fn invalid(name: &str, value: impl Into<String>, reason: impl Display) -> RelayError {
    RelayError::InvalidEnv {
        name: name.to_string(),
        value: value.into(),
        reason: reason.to_string(),
    }
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(v) => v.parse().map_err(|e| invalid(name, v.clone(), e)),
        None => Ok(default),
    }
}

fn secs_or(name: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    match value {
        Some(v) => Ok(Duration::from_secs(parse_or(name, Some(v), 0u64)?)),
        None => Ok(default),
    }
}

fn bool_or(name: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(v) = value else {
        return Ok(default);
    };
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, v, "expected true or false")),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
