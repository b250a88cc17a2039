//! Message bodies, rendered as Telegram HTML.

use chrono::{DateTime, Local, Utc};

use frigate_models::{normalize_tag, normalized_tags, Event, PollMode};

use crate::config::RelayConfig;

/// Timestamp layout used in every message.
pub const TIME_FORMAT: &str = "%H:%M:%S %d/%m/%Y";

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Caption of chunk `index` (1-based) out of `total`.
pub fn part_caption(index: usize, total: usize) -> String {
    format!("part {} of {}", index, total)
}

/// Renders event notifications.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    external_url: String,
    small: bool,
    utc: bool,
}

impl MessageFormatter {
    /// Creates a formatter linking to `external_url`.
    pub fn new(external_url: impl Into<String>) -> Self {
        Self {
            external_url: external_url.into().trim_end_matches('/').to_string(),
            small: false,
            utc: false,
        }
    }

    /// Creates a formatter from the relay config.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.external_url.clone())
            .with_small(config.small_events)
            .with_utc(config.utc_times)
    }

    /// Omits score, id, zones and links.
    pub fn with_small(mut self, small: bool) -> Self {
        self.small = small;
        self
    }

    /// Renders times in UTC instead of local time.
    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    fn time(&self, at: Option<DateTime<Utc>>) -> String {
        match at {
            Some(at) if self.utc => at.format(TIME_FORMAT).to_string(),
            Some(at) => at.with_timezone(&Local).format(TIME_FORMAT).to_string(),
            None => "unknown".to_string(),
        }
    }

    fn events_url(&self, event: &Event) -> String {
        format!(
            "{}/events?cameras={}&labels={}&zones={}",
            self.external_url,
            event.camera,
            event.label,
            normalized_tags(&event.zones).join(",")
        )
    }

    fn clip_url(&self, event: &Event) -> String {
        format!("{}/api/events/{}/clip.mp4", self.external_url, event.id)
    }

    /// Body of the media notification for `event`.
    pub fn event_body(&self, event: &Event) -> String {
        let mut text = String::from("<b>Event</b>\n");
        push_field(&mut text, "Camera", &hashtags(&[event.camera.as_str()]));
        push_field(&mut text, "Label", &hashtags(&[event.label.as_str()]));
        if !event.sub_labels.is_empty() {
            push_field(&mut text, "SubLabel", &hashtags(&event.sub_labels));
        }
        push_field(&mut text, "Start time", &code(&self.time(event.started_at())));
        let end = if event.is_finished() {
            self.time(event.ended_at())
        } else {
            "In progress".to_string()
        };
        push_field(&mut text, "End time", &code(&end));

        if !self.small {
            push_field(&mut text, "Top score", &code(&format!("{:.2}%", event.top_score() * 100.0)));
            push_field(&mut text, "Event id", &code(&event.id));
            push_field(&mut text, "Zones", &hashtags(&event.zones));
            text.push_str("<b>URLs</b>\n");
            text.push_str(&format!("┣{}\n", link("Events", &self.events_url(event))));
            text.push_str(&format!("┣{}\n", link("General", &self.external_url)));
            text.push_str(&format!("┗{}\n", link("Source clip", &self.clip_url(event))));
        }
        text
    }

    /// Body of the text-only notice sent by the text watch.
    pub fn text_notice(&self, event: &Event) -> String {
        let mut text = String::from("<b>New event</b>\n");
        push_field(&mut text, "Camera", &code(&event.camera));
        push_field(&mut text, "Label", &code(&event.label));
        push_field(&mut text, "Start time", &code(&self.time(event.started_at())));

        if !self.small {
            push_field(&mut text, "Top score", &code(&format!("{:.2}%", event.top_score() * 100.0)));
            push_field(&mut text, "Event id", &code(&event.id));
            push_field(&mut text, "Zones", &code(&normalized_tags(&event.zones).join(", ")));
            text.push_str("┣<b>Event URL</b>\n");
            text.push_str(&format!("┗ {}\n", escape_html(&self.events_url(event))));
        }
        text
    }
}

/// Text sent to the operator channel when the relay starts.
pub fn startup_message(config: &RelayConfig) -> String {
    let mut loops = vec![PollMode::Default.as_str()];
    if config.send_in_progress_events {
        loops.push(PollMode::InProgressWatch.as_str());
    }
    if config.send_text_events {
        loops.push(PollMode::TextWatch.as_str());
    }
    format!(
        "Starting frigate-relay.\nFrigate URL: {}\nLoops: {}",
        config.frigate_url,
        loops.join(", ")
    )
}

fn push_field(text: &mut String, name: &str, value: &str) {
    text.push_str(&format!("┣<b>{}</b>\n┗ {}\n", name, value));
}

fn code(value: &str) -> String {
    format!("<code>{}</code>", escape_html(value))
}

fn link(label: &str, url: &str) -> String {
    format!("<a href=\"{}\">{}</a>", escape_html(url), label)
}

fn hashtags<S: AsRef<str>>(tags: &[S]) -> String {
    let tags: Vec<String> = tags
        .iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .map(|t| format!("#{}", t))
        .collect();
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.join(", ")
    }
}
