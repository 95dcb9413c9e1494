//! In-process TTL cache for upstream stats payloads
//!
//! Provides the cache-aside storage used in front of rate-limited stats APIs:
//! - Unified key schema with versioning
//! - Entries replaced wholesale, never mutated in place
//! - Expired entries retained so callers can fall back to stale data
//! - Lock-free sharded map, last write wins
//! - Metrics integration

mod keys;
mod metrics;

pub use keys::{CacheKey, CACHE_VERSION};
pub use metrics::CacheMetrics;

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A cached value and the instant it stops being fresh
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// `None` when the TTL reaches past what the clock can represent
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }

    /// Whether the entry is still within `retention` of its expiry
    fn retained_at(&self, now: Instant, retention: Duration) -> bool {
        match self.expires_at.and_then(|at| at.checked_add(retention)) {
            Some(deadline) => now < deadline,
            None => true,
        }
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Fresh(V),
    /// Past its expiry; only usable as a fallback
    Stale(V),
    Missing,
}

impl<V> Lookup<V> {
    pub fn fresh(self) -> Option<V> {
        match self {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }
}

/// Shared TTL cache
///
/// Cloning is cheap and every clone sees the same entries.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    metrics: CacheMetrics,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            metrics: CacheMetrics::new(),
        }
    }

    /// Look up `key`, distinguishing live entries from expired ones
    pub fn get(&self, key: &str) -> Lookup<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh_at(now) => {
                debug!(key = %key, "Cache hit");
                self.metrics.record_hit(key);
                Lookup::Fresh(entry.value.clone())
            }
            Some(entry) => {
                debug!(key = %key, "Cache expired");
                self.metrics.record_miss(key);
                Lookup::Stale(entry.value.clone())
            }
            None => {
                debug!(key = %key, "Cache miss");
                self.metrics.record_miss(key);
                Lookup::Missing
            }
        }
    }

    /// Same as [`get`](Self::get) without touching hit/miss metrics
    pub fn peek(&self, key: &str) -> Lookup<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh_at(Instant::now()) => Lookup::Fresh(entry.value.clone()),
            Some(entry) => Lookup::Stale(entry.value.clone()),
            None => Lookup::Missing,
        }
    }

    /// Only a live entry; expired entries are never returned as fresh
    pub fn get_fresh(&self, key: &str) -> Option<V> {
        self.get(key).fresh()
    }

    /// Store `value` with a fresh expiry, replacing any previous entry
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(self.ttl),
        };
        self.metrics.record_write(&key);
        debug!(key = %key, ttl_secs = self.ttl.as_secs(), "Cache set");
        self.entries.insert(key, entry);
    }

    /// Mark a served stale entry in metrics
    pub fn note_stale_serve(&self, key: &str) {
        self.metrics.record_stale_serve(key);
    }

    /// Drop entries that expired more than `retention` ago
    pub fn purge_expired(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.retained_at(now, retention));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Cache purge");
            self.metrics.record_evictions("all", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
