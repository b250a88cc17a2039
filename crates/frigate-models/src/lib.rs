//! Core data models for the Frigate relay.
//!
//! This crate provides the fundamental data types shared by every other
//! crate in the workspace: detection events as decoded from the Frigate
//! API, the dedup lifecycle vocabulary, and the outbound message payload
//! handed to a notifier.

pub mod event;
pub mod lifecycle;
pub mod message;
pub mod tags;

// Re-export main types
pub use event::{Event, EventData};
pub use lifecycle::{DedupKey, LifecycleState, PollMode, WATCHDOG_PREFIX};
pub use message::{Attachment, AttachmentKind, OutboundMessage};
pub use tags::{normalize_tag, normalized_tags};
