use super::events::{EventBus, ListenerId, RegistryEvent, RegistryEventType};
use crate::generator::GeneratedEndpoint;
use crate::matcher::{compile_path, ParamVec, PathMatcher};
use crate::rbac::{AccessDecision, RbacCheckResult, RbacEngine, UserContext};
use anyhow::Context;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Trailing-slash handling for path lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingSlash {
    /// `/users/` and `/users` are the same path
    #[default]
    Normalize,
    /// Trailing slashes are significant
    Strict,
}

/// Registry tuning knobs.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound on lookup-cache entries; oldest-inserted evict first
    pub max_cache_entries: usize,
    /// Trailing-slash handling for lookups
    pub trailing_slash: TrailingSlash,
    /// Disable the lookup cache entirely (diagnostics)
    pub cache_enabled: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 1024,
            trailing_slash: TrailingSlash::default(),
            cache_enabled: true,
        }
    }
}

/// Result of a successful path lookup.
#[derive(Debug, Clone)]
pub struct EndpointMatch {
    /// The matched endpoint
    pub endpoint: Arc<GeneratedEndpoint>,
    /// Path parameters extracted by the winning matcher
    pub params: ParamVec,
    /// The winning matcher's specificity score
    pub score: u32,
}

/// Registry statistics snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub endpoints: usize,
    pub lookups: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_entries: usize,
    pub events_emitted: u64,
}

/// One registered endpoint with its compiled matcher, in registration order.
struct CompiledEntry {
    id: String,
    method: Method,
    matcher: PathMatcher,
    endpoint: Arc<GeneratedEndpoint>,
}

#[derive(Default)]
struct RegistryInner {
    /// Endpoints by id
    endpoints: HashMap<String, Arc<GeneratedEndpoint>>,
    /// Matchers in registration order — order is the documented tie-break
    entries: Vec<CompiledEntry>,
}

/// Cached outcome of one (method, path) lookup. `None` caches a miss.
type CachedLookup = Option<EndpointMatch>;

#[derive(Default)]
struct LookupCache {
    map: HashMap<(Method, String), CachedLookup>,
    /// Insertion order for FIFO eviction
    order: VecDeque<(Method, String)>,
}

impl LookupCache {
    fn insert(&mut self, key: (Method, String), value: CachedLookup, max_entries: usize) {
        if !self.map.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.map.insert(key, value);
        while self.map.len() > max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
        }
    }

    /// Drop cached lookups a new/removed matcher could plausibly affect.
    ///
    /// Intentionally conservative: an entry is dropped when its path and the
    /// matcher's static prefix overlap in either direction. Over-invalidating
    /// costs a rescan; under-invalidating would serve stale matches.
    fn invalidate_overlapping(&mut self, method: &Method, matcher: &PathMatcher) {
        let prefix = matcher.static_prefix.as_str();
        self.map.retain(|(cached_method, cached_path), _| {
            !(cached_method == method
                && (cached_path.starts_with(prefix) || prefix.starts_with(cached_path.as_str())))
        });
        self.order.retain(|key| self.map.contains_key(key));
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// The central endpoint store.
///
/// Keyed by endpoint id, indexed by compiled matcher. Registration is rare
/// relative to lookups, so the store sits behind a single writer lock with
/// many readers; the lookup cache has its own mutex and the RBAC engine
/// caches independently.
pub struct EndpointRegistry {
    inner: RwLock<RegistryInner>,
    cache: Mutex<LookupCache>,
    events: EventBus,
    rbac: RwLock<Option<Arc<RbacEngine>>>,
    config: RegistryConfig,
    lookups: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl EndpointRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            cache: Mutex::new(LookupCache::default()),
            events: EventBus::new(),
            rbac: RwLock::new(None),
            config,
            lookups: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Attach an RBAC engine; [`EndpointRegistry::check_access`] delegates to it.
    pub fn set_rbac(&self, engine: Arc<RbacEngine>) {
        if let Ok(mut slot) = self.rbac.write() {
            *slot = Some(engine);
        }
    }

    /// Register one endpoint, replacing any prior endpoint with the same id.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint's path pattern does not compile.
    pub fn register(&self, endpoint: GeneratedEndpoint) -> anyhow::Result<()> {
        let matcher = compile_path(&endpoint.path)
            .with_context(|| format!("failed to compile matcher for endpoint {}", endpoint.id))?;
        let id = endpoint.id.clone();
        let method = endpoint.method.clone();
        let endpoint = Arc::new(endpoint);

        let replaced_matcher = {
            let mut inner = self.write_inner();
            let replaced = remove_entry(&mut inner, &id);
            inner.endpoints.insert(id.clone(), Arc::clone(&endpoint));
            inner.entries.push(CompiledEntry {
                id: id.clone(),
                method: method.clone(),
                matcher: matcher.clone(),
                endpoint,
            });
            replaced
        };

        self.with_cache(|cache| {
            if let Some((old_method, old_matcher)) = &replaced_matcher {
                cache.invalidate_overlapping(old_method, old_matcher);
            }
            cache.invalidate_overlapping(&method, &matcher);
        });

        debug!(endpoint_id = %id, method = %method, "Endpoint registered");
        self.events
            .emit(&RegistryEvent::single(RegistryEventType::Registered, id));
        Ok(())
    }

    /// Register a batch of endpoints under one writer lock.
    ///
    /// Clears the whole lookup cache instead of per-entry invalidation —
    /// the batch path exists for initial load and full rescans, where the
    /// cache is mostly stale anyway. Readers never observe a partially
    /// applied batch.
    ///
    /// # Errors
    ///
    /// Fails before touching the registry if any endpoint's path pattern
    /// does not compile.
    pub fn register_batch(&self, endpoints: Vec<GeneratedEndpoint>) -> anyhow::Result<usize> {
        let mut compiled = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let matcher = compile_path(&endpoint.path).with_context(|| {
                format!("failed to compile matcher for endpoint {}", endpoint.id)
            })?;
            compiled.push((matcher, endpoint));
        }
        let count = compiled.len();

        {
            let mut inner = self.write_inner();
            for (matcher, endpoint) in compiled {
                let id = endpoint.id.clone();
                let method = endpoint.method.clone();
                let endpoint = Arc::new(endpoint);
                remove_entry(&mut inner, &id);
                inner.endpoints.insert(id.clone(), Arc::clone(&endpoint));
                inner.entries.push(CompiledEntry {
                    id,
                    method,
                    matcher,
                    endpoint,
                });
            }
        }

        self.with_cache(LookupCache::clear);
        info!(count, "Endpoint batch registered");
        self.events.emit(&RegistryEvent::bulk(
            RegistryEventType::BatchRegistered,
            count,
        ));
        Ok(count)
    }

    /// Remove an endpoint by id. Returns whether it was present.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = {
            let mut inner = self.write_inner();
            inner.endpoints.remove(id);
            remove_entry(&mut inner, id)
        };
        let Some((method, matcher)) = removed else {
            return false;
        };

        self.with_cache(|cache| {
            cache.invalidate_overlapping(&method, &matcher);
        });

        debug!(endpoint_id = %id, "Endpoint unregistered");
        self.events
            .emit(&RegistryEvent::single(RegistryEventType::Unregistered, id));
        true
    }

    /// Replace an endpoint in place.
    ///
    /// Removes the old matcher when the path changed, so no residual match
    /// remains on the old path. Updating an unknown id degrades to a plain
    /// registration; the return value reports whether a prior endpoint
    /// existed.
    ///
    /// # Errors
    ///
    /// Fails when the new path pattern does not compile.
    pub fn update(&self, endpoint: GeneratedEndpoint) -> anyhow::Result<bool> {
        let matcher = compile_path(&endpoint.path)
            .with_context(|| format!("failed to compile matcher for endpoint {}", endpoint.id))?;
        let id = endpoint.id.clone();
        let method = endpoint.method.clone();
        let endpoint = Arc::new(endpoint);

        let replaced_matcher = {
            let mut inner = self.write_inner();
            let replaced = remove_entry(&mut inner, &id);
            inner.endpoints.insert(id.clone(), Arc::clone(&endpoint));
            inner.entries.push(CompiledEntry {
                id: id.clone(),
                method: method.clone(),
                matcher: matcher.clone(),
                endpoint,
            });
            replaced
        };
        let existed = replaced_matcher.is_some();

        self.with_cache(|cache| {
            if let Some((old_method, old_matcher)) = &replaced_matcher {
                cache.invalidate_overlapping(old_method, old_matcher);
            }
            cache.invalidate_overlapping(&method, &matcher);
        });

        let event_type = if existed {
            RegistryEventType::Updated
        } else {
            RegistryEventType::Registered
        };
        debug!(endpoint_id = %id, existed, "Endpoint updated");
        self.events.emit(&RegistryEvent::single(event_type, id));
        Ok(existed)
    }

    /// Apply a set of removals and upserts under one writer lock.
    ///
    /// This is the hot-reload path: an external reader either sees the
    /// registry as it was before the batch or after all of it, never a
    /// partial application. The lookup cache is cleared wholesale and
    /// per-endpoint events are emitted after the lock is released.
    ///
    /// # Errors
    ///
    /// Fails before touching the registry if any upserted endpoint's path
    /// pattern does not compile.
    pub fn apply_batch(
        &self,
        remove_ids: Vec<String>,
        upserts: Vec<GeneratedEndpoint>,
    ) -> anyhow::Result<(usize, usize)> {
        let mut compiled = Vec::with_capacity(upserts.len());
        for endpoint in upserts {
            let matcher = compile_path(&endpoint.path).with_context(|| {
                format!("failed to compile matcher for endpoint {}", endpoint.id)
            })?;
            compiled.push((matcher, endpoint));
        }

        let mut events = Vec::new();
        let (removed, upserted) = {
            let mut inner = self.write_inner();
            let mut removed = 0usize;
            for id in &remove_ids {
                if inner.endpoints.remove(id).is_some() {
                    remove_entry(&mut inner, id);
                    removed += 1;
                    events.push(RegistryEvent::single(
                        RegistryEventType::Unregistered,
                        id.as_str(),
                    ));
                }
            }
            let upserted = compiled.len();
            for (matcher, endpoint) in compiled {
                let id = endpoint.id.clone();
                let method = endpoint.method.clone();
                let endpoint = Arc::new(endpoint);
                let existed = remove_entry(&mut inner, &id).is_some();
                inner.endpoints.insert(id.clone(), Arc::clone(&endpoint));
                inner.entries.push(CompiledEntry {
                    id: id.clone(),
                    method,
                    matcher,
                    endpoint,
                });
                let event_type = if existed {
                    RegistryEventType::Updated
                } else {
                    RegistryEventType::Registered
                };
                events.push(RegistryEvent::single(event_type, id));
            }
            (removed, upserted)
        };

        self.with_cache(LookupCache::clear);
        info!(removed, upserted, "Registry batch applied");
        for event in &events {
            self.events.emit(event);
        }
        Ok((removed, upserted))
    }

    /// Remove every endpoint and cached lookup.
    pub fn clear(&self) {
        let count = {
            let mut inner = self.write_inner();
            let count = inner.endpoints.len();
            inner.endpoints.clear();
            inner.entries.clear();
            count
        };
        self.with_cache(LookupCache::clear);
        info!(count, "Registry cleared");
        self.events
            .emit(&RegistryEvent::bulk(RegistryEventType::Cleared, count));
    }

    /// Fetch an endpoint by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<GeneratedEndpoint>> {
        self.read_inner().endpoints.get(id).map(Arc::clone)
    }

    /// Best-match lookup by method and request path.
    ///
    /// Serves from the lookup cache when possible; otherwise scans every
    /// matcher for the method, keeps the highest-scoring match, and caches
    /// the result — including an explicit miss. Ties on score go to the
    /// first-registered endpoint; this ordering is the documented tie-break
    /// policy, not an accident.
    #[must_use]
    pub fn get_by_path(&self, path: &str, method: &Method) -> Option<EndpointMatch> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let normalized = self.normalize(path);
        let key = (method.clone(), normalized.clone());

        if self.config.cache_enabled {
            if let Ok(cache) = self.cache.lock() {
                if let Some(cached) = cache.map.get(&key) {
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return cached.clone();
                }
            }
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let result = {
            let inner = self.read_inner();
            let mut best: Option<EndpointMatch> = None;
            for entry in inner.entries.iter().filter(|e| e.method == *method) {
                let Some(hit) = entry.matcher.match_path(&normalized) else {
                    continue;
                };
                let better = match &best {
                    Some(current) => hit.score > current.score,
                    None => true,
                };
                if better {
                    best = Some(EndpointMatch {
                        endpoint: Arc::clone(&entry.endpoint),
                        params: hit.params,
                        score: hit.score,
                    });
                }
            }
            best
        };

        if self.config.cache_enabled {
            self.with_cache(|cache| {
                cache.insert(key, result.clone(), self.config.max_cache_entries);
            });
        }

        if result.is_none() {
            debug!(method = %method, path = %normalized, "No endpoint matched");
        }
        result
    }

    /// Endpoints carrying a tag.
    #[must_use]
    pub fn get_by_tag(&self, tag: &str) -> Vec<Arc<GeneratedEndpoint>> {
        let inner = self.read_inner();
        let mut found: Vec<_> = inner
            .entries
            .iter()
            .filter(|e| e.endpoint.tags.iter().any(|t| t == tag))
            .map(|e| Arc::clone(&e.endpoint))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    /// Endpoints addressing a resource (first tag).
    #[must_use]
    pub fn get_by_resource(&self, resource: &str) -> Vec<Arc<GeneratedEndpoint>> {
        let inner = self.read_inner();
        let mut found: Vec<_> = inner
            .entries
            .iter()
            .filter(|e| e.endpoint.tags.first().is_some_and(|t| t == resource))
            .map(|e| Arc::clone(&e.endpoint))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    /// Every registered endpoint, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<GeneratedEndpoint>> {
        self.read_inner()
            .entries
            .iter()
            .map(|e| Arc::clone(&e.endpoint))
            .collect()
    }

    /// Number of registered endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_inner().endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate access for an endpoint id against a caller.
    ///
    /// Delegates to the attached RBAC engine when one is configured.
    /// Without one, applies the minimal default: allow unless the endpoint
    /// requires authentication and the caller is unauthenticated. Unknown
    /// ids produce an explicit denied "endpoint not found" result, never an
    /// error.
    #[must_use]
    pub fn check_access(
        &self,
        endpoint_id: &str,
        user: Option<&UserContext>,
        context: Option<&Value>,
    ) -> RbacCheckResult {
        let Some(endpoint) = self.get(endpoint_id) else {
            warn!(endpoint_id = %endpoint_id, "Access check against unknown endpoint");
            return RbacCheckResult::denied(
                AccessDecision::Deny,
                format!("endpoint not found: {endpoint_id}"),
            );
        };

        let engine = self.rbac.read().ok().and_then(|slot| slot.clone());
        match engine {
            Some(engine) => engine.check_access(&endpoint, user, context),
            None => {
                let authenticated = user.is_some_and(|u| u.authenticated);
                if endpoint.access.requires_auth && !authenticated {
                    RbacCheckResult::denied(
                        AccessDecision::RequiresAuth,
                        "authentication required".to_string(),
                    )
                } else {
                    RbacCheckResult::allowed("no rbac engine configured; default allow")
                }
            }
        }
    }

    /// Subscribe to registry events.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    /// Remove an event listener.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let cache_entries = self.cache.lock().map(|c| c.map.len()).unwrap_or(0);
        RegistryStats {
            endpoints: self.len(),
            lookups: self.lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_entries,
            events_emitted: self.events.emitted(),
        }
    }

    fn normalize(&self, path: &str) -> String {
        match self.config.trailing_slash {
            TrailingSlash::Strict => path.to_string(),
            TrailingSlash::Normalize => {
                let trimmed = path.trim_end_matches('/');
                if trimmed.is_empty() {
                    "/".to_string()
                } else {
                    trimmed.to_string()
                }
            }
        }
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_cache(&self, f: impl FnOnce(&mut LookupCache)) {
        if let Ok(mut cache) = self.cache.lock() {
            f(&mut cache);
        }
    }
}

/// Remove an entry by id, returning its method and matcher when it existed.
fn remove_entry(inner: &mut RegistryInner, id: &str) -> Option<(Method, PathMatcher)> {
    let position = inner.entries.iter().position(|e| e.id == id)?;
    let entry = inner.entries.remove(position);
    Some((entry.method, entry.matcher))
}
