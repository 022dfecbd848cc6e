//! # Endpoint Registry Module
//!
//! The registry is the central endpoint store: keyed by id, indexed by
//! compiled matcher, with best-match lookup, a bounded result cache, an
//! event bus, and statistics.
//!
//! ## Overview
//!
//! Endpoint lifecycle: `unregistered → registered → (updated)* →
//! unregistered`. Operations:
//!
//! - [`EndpointRegistry::register`] / [`EndpointRegistry::register_batch`] —
//!   compile and store matchers; single registration invalidates cached
//!   lookups by conservative static-prefix overlap, batch registration
//!   clears the whole cache
//! - [`EndpointRegistry::get_by_path`] — linear scan over the method's
//!   matchers keeping the highest specificity score; results (including
//!   explicit misses) are cached with FIFO eviction
//! - [`EndpointRegistry::check_access`] — delegates to the attached RBAC
//!   engine, or applies the minimal auth-only default
//!
//! ## Consistency
//!
//! The lookup cache must never serve a match for a path whose owning
//! endpoint was removed or updated. Invalidation is by static-prefix
//! overlap rather than exact key, deliberately over-invalidating.
//!
//! ## Process-default instance
//!
//! Construction is explicit and instances are passed by `Arc`; for hosts
//! that want a process-wide registry, a default slot with an explicit
//! init/reset lifecycle is provided via [`init_default`], [`default_registry`],
//! and [`reset_default`].

mod core;
mod events;

pub use core::{
    EndpointMatch, EndpointRegistry, RegistryConfig, RegistryStats, TrailingSlash,
};
pub use events::{EventBus, ListenerId, RegistryEvent, RegistryEventType};

use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use std::sync::Arc;

static DEFAULT_REGISTRY: Lazy<ArcSwapOption<EndpointRegistry>> =
    Lazy::new(ArcSwapOption::empty);

/// Install a process-wide default registry, replacing any prior one.
pub fn init_default(registry: EndpointRegistry) -> Arc<EndpointRegistry> {
    let registry = Arc::new(registry);
    DEFAULT_REGISTRY.store(Some(Arc::clone(&registry)));
    registry
}

/// The process-wide default registry, if one was installed.
#[must_use]
pub fn default_registry() -> Option<Arc<EndpointRegistry>> {
    DEFAULT_REGISTRY.load_full()
}

/// Remove the process-wide default registry.
pub fn reset_default() {
    DEFAULT_REGISTRY.store(None);
}
