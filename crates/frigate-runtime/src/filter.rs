//! Camera filtering for polled events.

use frigate_models::Event;

/// Exclude-list values meaning "exclude nothing".
pub const EXCLUDE_SENTINELS: [&str; 2] = ["disable", "none"];

/// Include-list value meaning "include everything".
pub const INCLUDE_SENTINEL: &str = "all";

/// Exclude/include camera lists.
///
/// A list that is empty or holds only its sentinel does not filter. The
/// exclude list is checked first and wins over the include list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraFilter {
    /// Cameras to drop, `None` when excluding nothing.
    pub exclude: Option<Vec<String>>,
    /// Cameras to keep, `None` when including everything.
    pub include: Option<Vec<String>>,
}

impl CameraFilter {
    /// Creates a filter that lets every camera through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from configured lists, honouring the sentinels.
    pub fn from_lists(exclude: &[String], include: &[String]) -> Self {
        Self {
            exclude: (!is_sentinel(exclude, &EXCLUDE_SENTINELS)).then(|| exclude.to_vec()),
            include: (!is_sentinel(include, &[INCLUDE_SENTINEL])).then(|| include.to_vec()),
        }
    }

    /// Sets the exclude list.
    pub fn with_exclude<I, S>(mut self, cameras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(cameras.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the include list.
    pub fn with_include<I, S>(mut self, cameras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(cameras.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true if events from `camera` may be notified.
    pub fn allows(&self, camera: &str) -> bool {
        if let Some(ref exclude) = self.exclude {
            if exclude.iter().any(|c| c == camera) {
                return false;
            }
        }

        if let Some(ref include) = self.include {
            if !include.iter().any(|c| c == camera) {
                return false;
            }
        }

        true
    }

    /// Returns true if the event's camera may be notified.
    pub fn matches(&self, event: &Event) -> bool {
        self.allows(&event.camera)
    }
}

fn is_sentinel(list: &[String], sentinels: &[&str]) -> bool {
    match list {
        [] => true,
        [only] => {
            let only = only.trim();
            sentinels.iter().any(|s| s.eq_ignore_ascii_case(only))
        }
        _ => false,
    }
}
