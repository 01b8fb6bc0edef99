//! Fetch result cache
//!
//! Successful fetches are kept for a fixed TTL, keyed by
//! identifier + language + requested conversion. Expiry is checked lazily
//! on read; `clear_expired` lets a background task sweep the rest.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::subtitle::ConversionTarget;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identifier: String,
    pub language: String,
    pub conversion: Option<ConversionTarget>,
}

impl CacheKey {
    pub fn new(
        identifier: impl Into<String>,
        language: impl Into<String>,
        conversion: Option<ConversionTarget>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            language: language.into(),
            conversion,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() > ttl
    }
}

pub struct ResultCache<V> {
    entries: DashMap<CacheKey, CacheEntry<V>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    /// Look up a live entry. An expired entry is evicted and reported as a
    /// miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let live = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => Some(entry.value.clone()),
            Some(_) => None,
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match live {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                // Re-check under the write lock; a fresh put may have raced us.
                self.entries
                    .remove_if(key, |_, entry| entry.is_expired(self.ttl));
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value, replacing any previous entry and restarting its TTL.
    pub fn put(&self, key: CacheKey, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn clear_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let oldest = self
            .entries
            .iter()
            .map(|e| e.value().stored_at.elapsed().as_secs())
            .max()
            .unwrap_or(0);

        CacheStats {
            entry_count: self.entries.len(),
            ttl_secs: self.ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            oldest_entry_age_secs: oldest,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    pub oldest_entry_age_secs: u64,
}
