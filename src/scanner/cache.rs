//! Scan result cache.
//!
//! Walking a large routes tree costs filesystem I/O on every call. The cache
//! keyed by (root, config fingerprint) serves repeat scans within a TTL
//! window without touching the filesystem. Explicit invalidation by root
//! prefix supports hot-reload: when a watcher reports a change under a root,
//! every cached scan for that root is dropped.

use super::core::{ScannedRoute, Scanner};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// Hit/miss accounting for a [`ScanCache`].
#[derive(Debug, Clone, Copy)]
pub struct ScanCacheStats {
    /// Scans served from cache
    pub hits: u64,
    /// Scans that walked the filesystem
    pub misses: u64,
    /// Entries currently cached
    pub entries: usize,
}

struct CacheEntry {
    routes: Arc<Vec<ScannedRoute>>,
    inserted_at: Instant,
    root: PathBuf,
}

/// TTL cache over [`Scanner::scan`] results.
pub struct ScanCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ScanCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Scan through the cache.
    ///
    /// Serves a cached result when one exists for the scanner's
    /// (root, fingerprint) key and is younger than the TTL; otherwise walks
    /// the filesystem and stores the fresh result.
    ///
    /// # Errors
    ///
    /// Propagates [`Scanner::scan`] errors; failed scans are not cached.
    pub fn scan(&self, scanner: &Scanner) -> anyhow::Result<Arc<Vec<ScannedRoute>>> {
        let key = scanner.config().fingerprint();

        if let Ok(entries) = self.entries.read() {
            if let Some(entry) = entries.get(&key) {
                if entry.inserted_at.elapsed() <= self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Scan served from cache");
                    return Ok(Arc::clone(&entry.routes));
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let routes = Arc::new(scanner.scan()?);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                CacheEntry {
                    routes: Arc::clone(&routes),
                    inserted_at: Instant::now(),
                    root: scanner.config().root.clone(),
                },
            );
        }
        Ok(routes)
    }

    /// Drop every cached scan whose root starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_root(&self, prefix: &Path) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| !entry.root.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(prefix = %prefix.display(), removed, "Invalidated cached scans");
        }
        removed
    }

    /// Drop every cached scan.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Current hit/miss statistics.
    #[must_use]
    pub fn stats(&self) -> ScanCacheStats {
        ScanCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().map(|e| e.len()).unwrap_or(0),
        }
    }
}
