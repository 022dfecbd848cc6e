//! # Hot Reload Module
//!
//! Live reloading of the routes tree without restarting the host.
//!
//! ## Overview
//!
//! Hot reload watches the routes directory for changes and:
//! - Rescans the tree and regenerates the endpoint set
//! - Diffs the fresh set against the live registry (added/removed/updated)
//! - Applies the diff atomically — readers never observe a registry state
//!   containing only some of the batch's removals/additions
//! - Invalidates affected RBAC decision cache entries
//!
//! ## Error Handling
//!
//! If a rescan or regeneration fails, the error is logged and the previous
//! endpoint set remains live. The host keeps serving requests even while
//! the routes tree is mid-edit.
//!
//! ## Performance
//!
//! Hot reload is a development tool. Applying a diff briefly holds the
//! registry writer lock and drops the whole lookup cache; do not wire it to
//! trees that change many times per second.

use crate::generator::{EndpointGenerator, GeneratedEndpoint};
use crate::rbac::RbacEngine;
use crate::registry::EndpointRegistry;
use crate::scanner::Scanner;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Added/removed/updated endpoint sets between two scans.
#[derive(Debug, Default)]
pub struct EndpointDiff {
    /// Endpoints present only in the new scan
    pub added: Vec<GeneratedEndpoint>,
    /// Ids present only in the live registry
    pub removed: Vec<String>,
    /// Endpoints whose shape changed between scans
    pub updated: Vec<GeneratedEndpoint>,
}

impl EndpointDiff {
    /// Whether the diff contains no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Whether two generations of the same endpoint id differ in shape.
fn endpoint_changed(current: &GeneratedEndpoint, next: &GeneratedEndpoint) -> bool {
    current.path != next.path
        || current.method != next.method
        || current.access != next.access
        || current.request_schema != next.request_schema
        || current.response_schema != next.response_schema
        || current.query_params != next.query_params
        || current.tags != next.tags
        || current.middleware.len() != next.middleware.len()
        || current
            .middleware
            .iter()
            .zip(next.middleware.iter())
            .any(|(a, b)| a.name != b.name)
}

/// Diff a freshly generated endpoint set against the live one.
#[must_use]
pub fn diff_endpoints(
    current: &[Arc<GeneratedEndpoint>],
    next: Vec<GeneratedEndpoint>,
) -> EndpointDiff {
    let current_by_id: HashMap<&str, &Arc<GeneratedEndpoint>> =
        current.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut diff = EndpointDiff::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(next.len());
    for endpoint in next {
        seen.insert(endpoint.id.clone());
        match current_by_id.get(endpoint.id.as_str()) {
            None => diff.added.push(endpoint),
            Some(existing) if endpoint_changed(existing, &endpoint) => {
                diff.updated.push(endpoint);
            }
            Some(_) => {}
        }
    }
    for endpoint in current {
        if !seen.contains(&endpoint.id) {
            diff.removed.push(endpoint.id.clone());
        }
    }
    diff
}

/// Apply a diff to the registry atomically.
///
/// Removals and upserts land under a single writer lock; affected RBAC
/// decision cache entries are invalidated afterwards.
///
/// # Errors
///
/// Fails without modifying the registry if any added/updated endpoint's
/// path pattern does not compile.
pub fn apply_diff(
    registry: &EndpointRegistry,
    diff: EndpointDiff,
    rbac: Option<&RbacEngine>,
) -> anyhow::Result<()> {
    if diff.is_empty() {
        return Ok(());
    }

    let mut invalidate: Vec<String> = diff.removed.clone();
    invalidate.extend(diff.updated.iter().map(|e| e.id.clone()));

    let mut upserts = diff.added;
    upserts.extend(diff.updated);
    let (removed, upserted) = registry.apply_batch(diff.removed, upserts)?;

    if let Some(engine) = rbac {
        for id in &invalidate {
            engine.invalidate_endpoint(id);
        }
    }

    info!(removed, upserted, "Hot-reload diff applied");
    Ok(())
}

/// Watch a routes tree and reapply scan diffs when it changes.
///
/// The provided callback observes the registry after each applied diff so
/// the caller can propagate the change further (e.g., regenerate
/// documentation). Keep the returned watcher alive for as long as reloading
/// should stay active.
///
/// # Errors
///
/// Returns an error when the filesystem watcher cannot be installed.
pub fn watch_routes<F>(
    scanner: Scanner,
    generator: EndpointGenerator,
    registry: Arc<EndpointRegistry>,
    rbac: Option<Arc<RbacEngine>>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    F: FnMut(&EndpointRegistry) + Send + 'static,
{
    let root = scanner.config().root.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                let endpoints =
                    match scanner.scan().and_then(|routes| generator.generate_all(&routes)) {
                        Ok(endpoints) => endpoints,
                        Err(err) => {
                            warn!(error = %err, "Hot-reload rescan failed; keeping previous endpoints");
                            return;
                        }
                    };
                let diff = diff_endpoints(&registry.list(), endpoints);
                if diff.is_empty() {
                    return;
                }
                info!(
                    added = diff.added.len(),
                    removed = diff.removed.len(),
                    updated = diff.updated.len(),
                    "Hot-reload: applying route updates"
                );
                match apply_diff(&registry, diff, rbac.as_deref()) {
                    Ok(()) => on_reload(&registry),
                    Err(err) => {
                        warn!(error = %err, "Hot-reload apply failed; keeping previous endpoints");
                    }
                }
            }
            Err(err) => warn!(error = %err, "Routes watcher error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    Ok(watcher)
}
