//! # Runtime Configuration Module
//!
//! Environment variable-based tuning for trailhead's caches.
//!
//! ## Environment Variables
//!
//! ### `TRAILHEAD_LOOKUP_CACHE`
//!
//! `off` disables the registry's lookup cache entirely (diagnostics).
//! Any other value, or unset, leaves it on.
//!
//! ### `TRAILHEAD_LOOKUP_CACHE_SIZE`
//!
//! Maximum lookup-cache entries before FIFO eviction. Default: `1024`.
//!
//! ### `TRAILHEAD_SCAN_CACHE_TTL_SECS`
//!
//! TTL in seconds for cached route scans. Default: `30`.
//!
//! ### `TRAILHEAD_DECISION_TTL_SECS`
//!
//! TTL in seconds for cached RBAC decisions. Default: `30`.
//!
//! ## Usage
//!
//! ```rust
//! use trailhead::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("lookup cache size: {}", config.lookup_cache_size);
//! ```
//!
//! Unparseable values fall back to the defaults rather than failing startup.

use crate::registry::RegistryConfig;
use std::env;
use std::time::Duration;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Whether the registry lookup cache is enabled (default: true)
    pub lookup_cache_enabled: bool,
    /// Lookup cache bound (default: 1024)
    pub lookup_cache_size: usize,
    /// Scan cache TTL (default: 30s)
    pub scan_cache_ttl: Duration,
    /// RBAC decision cache TTL (default: 30s)
    pub decision_ttl: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lookup_cache_enabled: true,
            lookup_cache_size: 1024,
            scan_cache_ttl: Duration::from_secs(30),
            decision_ttl: Duration::from_secs(30),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let lookup_cache_enabled = env::var("TRAILHEAD_LOOKUP_CACHE")
            .map(|v| !v.eq_ignore_ascii_case("off"))
            .unwrap_or(defaults.lookup_cache_enabled);
        let lookup_cache_size = env::var("TRAILHEAD_LOOKUP_CACHE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.lookup_cache_size);
        let scan_cache_ttl = env::var("TRAILHEAD_SCAN_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.scan_cache_ttl);
        let decision_ttl = env::var("TRAILHEAD_DECISION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.decision_ttl);
        Self {
            lookup_cache_enabled,
            lookup_cache_size,
            scan_cache_ttl,
            decision_ttl,
        }
    }

    /// Registry configuration derived from these settings.
    #[must_use]
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_cache_entries: self.lookup_cache_size,
            cache_enabled: self.lookup_cache_enabled,
            ..RegistryConfig::default()
        }
    }
}
