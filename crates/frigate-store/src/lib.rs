//! Dedup store for the Frigate relay.
//!
//! The relay remembers, per event key, the last notification outcome it
//! recorded. Entries expire on their own; nothing is ever deleted
//! explicitly.
//!
//! - `DedupStore` - the async trait the lifecycle tracker depends on
//! - `MemoryDedupStore` - in-process backend with per-key expiry
//!
//! # Example
//!
//! ```no_run
//! use frigate_store::{DedupStore, MemoryDedupStore};
//! use std::time::Duration;
//!
//! # async fn demo() -> frigate_store::Result<()> {
//! let store = MemoryDedupStore::new();
//! store.set("abc123", "InWork", Duration::from_secs(60)).await?;
//! assert!(store.exists("abc123").await?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryDedupStore;
pub use store::DedupStore;
