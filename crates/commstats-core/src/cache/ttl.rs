//! In-memory TTL cache with explicit staleness checks.

use crate::config::CacheSettings;
use mini_moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on distinct keys; the key space is one dashboard entry plus one
/// entry per listed collection.
const MAX_ENTRIES: u64 = 1_024;

/// A cached value and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Cache hit/miss counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Approximate; expired entries linger until evicted.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Process-local key/value cache with one TTL shared by every key.
///
/// Entries are replaced wholesale on `set` and never mutated in place. A read
/// older than the TTL is reported absent and evicts the entry.
pub struct TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    entries: Cache<String, CacheEntry<V>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache with the default TTL.
    pub fn new() -> Self {
        Self::with_ttl(CacheSettings::TTL)
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_ENTRIES)
                .build(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a value if present and younger than the TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        let key = key.to_string();
        match self.entries.get(&key) {
            Some(entry) if entry.is_fresh(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit: {}", key);
                Some(entry.value)
            }
            Some(_) => {
                self.entries.invalidate(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache entry expired: {}", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Store a value, overwriting any previous entry for the key.
    pub fn set(&self, key: &str, value: V) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove one key, or every key when `None`.
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => self.entries.invalidate(&key.to_string()),
            None => self.entries.invalidate_all(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.entry_count(),
        }
    }
}

impl<V> Default for TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
