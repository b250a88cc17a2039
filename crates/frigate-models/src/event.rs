//! Detection events as reported by the Frigate events API.
//!
//! Only the handful of fields the relay acts on are decoded; everything
//! else in the payload is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Detector payload nested under `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Best score seen for the tracked object (0.0 - 1.0).
    #[serde(default)]
    pub top_score: Option<f64>,

    /// Score of the most recent frame.
    #[serde(default)]
    pub score: Option<f64>,
}

/// One detection instance.
///
/// The `id` is stable for the whole life of a detection: in-progress and
/// finished reports of the same object share it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Source-assigned identifier.
    pub id: String,

    /// Camera that produced the detection.
    pub camera: String,

    /// Object label (`person`, `car`, ...).
    pub label: String,

    /// Unix timestamp (seconds) when tracking started.
    pub start_time: f64,

    /// Unix timestamp (seconds) when tracking ended; `None` while ongoing.
    #[serde(default)]
    pub end_time: Option<f64>,

    /// Recognised sub labels, null entries dropped.
    #[serde(default, rename = "sub_label", deserialize_with = "deserialize_tags")]
    pub sub_labels: Vec<String>,

    /// Zones the object entered, null entries dropped.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub zones: Vec<String>,

    /// Whether a recording clip exists for the event.
    #[serde(default)]
    pub has_clip: bool,

    /// Whether a snapshot exists for the event.
    #[serde(default)]
    pub has_snapshot: bool,

    /// Base64-encoded JPEG thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Detector payload.
    #[serde(default)]
    pub data: EventData,

    /// Top-level score reported by older Frigate releases.
    #[serde(
        default,
        rename = "top_score",
        deserialize_with = "deserialize_score",
        skip_serializing
    )]
    legacy_top_score: Option<f64>,
}

impl Event {
    /// Creates an in-progress event with the required fields.
    pub fn new(
        id: impl Into<String>,
        camera: impl Into<String>,
        label: impl Into<String>,
        start_time: f64,
    ) -> Self {
        Self {
            id: id.into(),
            camera: camera.into(),
            label: label.into(),
            start_time,
            end_time: None,
            sub_labels: Vec::new(),
            zones: Vec::new(),
            has_clip: false,
            has_snapshot: false,
            thumbnail: None,
            data: EventData::default(),
            legacy_top_score: None,
        }
    }

    /// Marks the event as finished at `end_time`.
    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Sets the zones.
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the sub labels.
    pub fn with_sub_labels<I, S>(mut self, sub_labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_labels = sub_labels.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the clip availability flag.
    pub fn with_clip(mut self, has_clip: bool) -> Self {
        self.has_clip = has_clip;
        self
    }

    /// Sets the base64 thumbnail.
    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// Sets the top score.
    pub fn with_top_score(mut self, score: f64) -> Self {
        self.data.top_score = Some(score);
        self
    }

    /// Returns true once the source has reported an end time.
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Best score for the detection, falling back to the legacy field.
    pub fn top_score(&self) -> f64 {
        self.data
            .top_score
            .or(self.legacy_top_score)
            .unwrap_or(0.0)
    }

    /// Start time as a UTC timestamp.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.start_time as i64, 0)
    }

    /// End time as a UTC timestamp.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.end_time
            .and_then(|t| DateTime::from_timestamp(t as i64, 0))
    }
}

/// Accepts `null`, a single string, or an array of mixed values and keeps
/// only the string entries in order.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let tags = match value {
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(tags)
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}
