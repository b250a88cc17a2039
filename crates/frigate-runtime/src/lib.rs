//! Poll loops, dedup lifecycle and dispatch for the Frigate relay.
//!
//! This crate turns Frigate's events API into chat notifications:
//! - `FrigateClient` - fetches events and streams clips
//! - `LifecycleTracker` - decides, per event and poll mode, whether to notify
//! - `EventPipeline` - builds and delivers one notification
//! - `Dispatcher` - runs the poll loops and supervises event tasks
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use frigate_runtime::{Dispatcher, FrigateClient, RelayConfig};
//! use frigate_store::MemoryDedupStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::from_env()?;
//!     let source = Arc::new(FrigateClient::new(&config.frigate_url)?);
//!     let notifier = Arc::new(MyNotifier::new());
//!
//!     let mut dispatcher = Dispatcher::new(
//!         config,
//!         source,
//!         Arc::new(MemoryDedupStore::new()),
//!         notifier,
//!         frigate_media::MediaChunker::new().ok(),
//!     );
//!     dispatcher.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     dispatcher.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Poll modes
//!
//! - **Default**: finished events older than `EVENT_BEFORE_SECONDS`, sent
//!   with thumbnail and clip. Unfinished events wait for a later cycle.
//! - **In-progress watch**: events still being tracked, announced once
//!   under a `WatchDog_` key.
//! - **Text watch**: a short text notice for every new event, sharing the
//!   `WatchDog_` key space with the in-progress watch.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod format;
pub mod lifecycle;
pub mod notifier;
pub mod pipeline;
pub mod source;

#[cfg(test)]
mod test_support;

pub use config::{RelayConfig, ThreadTable, MAX_RETENTION_TTL};
pub use dispatcher::{CycleReport, Dispatcher, PollLoop, TaskReport};
pub use error::{RelayError, Result};
pub use filter::CameraFilter;
pub use format::{escape_html, part_caption, startup_message, MessageFormatter};
pub use lifecycle::{decide, terminal_state, Decision, FireReason, LifecycleTracker, SkipReason};
pub use notifier::{report_text, ErrorReporter, Notifier, ALL_EVENTS};
pub use pipeline::{EventPipeline, PipelineOutcome};
pub use source::{decode_events, ClipDownload, EventQuery, EventSource, FrigateClient};
