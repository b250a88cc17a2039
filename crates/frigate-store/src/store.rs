//! DedupStore trait definition.
//!
//! Keys and values are plain strings; the TTL passed to `set` is advisory
//! expiry. Access is always read-then-write, so implementations need no
//! compare-and-swap primitive.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Key-value store with per-key expiry.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Returns the live value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value and
    /// restarting its expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Returns true if `key` holds a live value.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Drops expired entries and returns how many were removed.
    ///
    /// Backends that expire keys on their own keep the default.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}
