//! In-process dedup store.
//!
//! Holds entries in a `RwLock<HashMap>` and checks expiry lazily on read.
//! Expired entries linger until `purge_expired`, which the default poll
//! loop calls on every tick.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::store::DedupStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Dedup store backed by a map in process memory.
#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryDedupStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DedupStore for MemoryDedupStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(StoreError::InvalidTtl(key.to_string()));
        }

        trace!(key = %key, value = %value, ttl_secs = ttl.as_secs(), "setting dedup key");

        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StoreError::TtlOutOfRange {
                key: key.to_string(),
                secs: ttl.as_secs(),
            })?;
        let entry = Entry {
            value: value.to_string(),
            expires_at,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "purged expired dedup keys");
        }
        Ok(removed)
    }
}
