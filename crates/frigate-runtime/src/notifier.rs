//! Delivery seam and operator error reporting.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use frigate_models::OutboundMessage;

use crate::error::Result;

/// Event id used in reports that do not concern a single event.
pub const ALL_EVENTS: &str = "ALL";

/// Delivers composed messages to the chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message to its thread.
    async fn deliver(&self, message: &OutboundMessage) -> Result<()>;

    /// Sends plain text to the operator channel.
    async fn report(&self, text: &str) -> Result<()>;
}

/// Formats an operator report for `event_id`.
pub fn report_text(text: &str, event_id: &str) -> String {
    format!("{}\nEventID: {}", text, event_id)
}

/// Funnels every failure to the log and the operator channel.
#[derive(Clone)]
pub struct ErrorReporter {
    notifier: Arc<dyn Notifier>,
}

impl ErrorReporter {
    /// Creates a reporter sending through `notifier`.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Logs `text` and forwards it to the operator channel.
    ///
    /// Failure to send the report is only logged.
    pub async fn report(&self, text: &str, event_id: &str) {
        error!(event_id = %event_id, "{}", text);
        if let Err(e) = self.notifier.report(&report_text(text, event_id)).await {
            warn!(event_id = %event_id, error = %e, "failed to send error report");
        }
    }
}
