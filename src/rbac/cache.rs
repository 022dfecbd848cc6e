//! Per-(endpoint, user) decision cache.
//!
//! Access evaluations hit external checkers that may be slow; repeated
//! checks for the same caller against the same endpoint within the TTL
//! window are served from an LRU cache. The cache is keyed and locked
//! independently of the endpoint maps, so RBAC evaluation never contends
//! with registry writes.

use super::core::AccessDecision;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache accounting for the decision cache.
#[derive(Debug, Clone, Copy)]
pub struct DecisionCacheStats {
    /// Lookups served from cache
    pub hits: u64,
    /// Lookups that required a full evaluation
    pub misses: u64,
    /// Entries evicted due to LRU capacity
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
    /// Maximum capacity
    pub capacity: usize,
}

impl DecisionCacheStats {
    /// Cache hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CachedDecision {
    pub allowed: bool,
    pub decision: AccessDecision,
    pub reason: String,
    inserted_at: Instant,
}

pub(crate) struct DecisionCache {
    entries: Mutex<LruCache<(String, String), CachedDecision>>,
    ttl: Duration,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl DecisionCache {
    pub(crate) fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        let bounded = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(bounded)),
            ttl,
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Fetch a fresh cached decision; expired entries are dropped on read.
    pub(crate) fn get(&self, endpoint_id: &str, user_id: &str) -> Option<CachedDecision> {
        let key = (endpoint_id.to_string(), user_id.to_string());
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };
        let found = entries
            .get(&key)
            .map(|cached| (cached.inserted_at.elapsed() <= self.ttl, cached.clone()));
        match found {
            Some((true, cached)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(cached)
            }
            Some((false, _)) => {
                entries.pop(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub(crate) fn insert(
        &self,
        endpoint_id: &str,
        user_id: &str,
        allowed: bool,
        decision: AccessDecision,
        reason: String,
    ) {
        let key = (endpoint_id.to_string(), user_id.to_string());
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let evicted = entries.push(
            key.clone(),
            CachedDecision {
                allowed,
                decision,
                reason,
                inserted_at: Instant::now(),
            },
        );
        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drop every cached decision for one endpoint (all users).
    pub(crate) fn invalidate_endpoint(&self, endpoint_id: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let stale: Vec<(String, String)> = entries
            .iter()
            .filter(|((cached_endpoint, _), _)| cached_endpoint.as_str() == endpoint_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub(crate) fn stats(&self) -> DecisionCacheStats {
        DecisionCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.entries.lock().map(|e| e.len()).unwrap_or(0),
            capacity: self.capacity,
        }
    }
}
