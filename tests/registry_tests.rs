mod common;

use common::test_endpoint;
use http::Method;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trailhead::rbac::{AccessDecision, UserContext};
use trailhead::registry::{
    default_registry, init_default, reset_default, EndpointRegistry, RegistryConfig,
    RegistryEventType, TrailingSlash,
};

fn registry() -> EndpointRegistry {
    EndpointRegistry::new(RegistryConfig::default())
}

#[test]
fn test_register_and_lookup_round_trip() {
    let registry = registry();
    registry
        .register(test_endpoint(Method::GET, "/api/users/:id"))
        .expect("register");

    let found = registry
        .get_by_path("/api/users/123", &Method::GET)
        .expect("match");
    assert_eq!(found.endpoint.id, "get_api_users_id");
    assert_eq!(found.params[0].1, "123");
    assert_eq!(found.score, 21);

    assert!(registry.unregister("get_api_users_id"));
    assert!(
        registry.get_by_path("/api/users/123", &Method::GET).is_none(),
        "unregistered endpoint must not match"
    );
}

#[test]
fn test_static_beats_dynamic_on_score() {
    let registry = registry();
    // Register the dynamic pattern first so scan order alone would pick it.
    registry
        .register(test_endpoint(Method::GET, "/api/users/:id"))
        .expect("register");
    registry
        .register(test_endpoint(Method::GET, "/api/users/new"))
        .expect("register");

    let found = registry
        .get_by_path("/api/users/new", &Method::GET)
        .expect("match");
    assert_eq!(found.endpoint.id, "get_api_users_new");
    assert_eq!(found.score, 30);

    let found = registry
        .get_by_path("/api/users/42", &Method::GET)
        .expect("match");
    assert_eq!(found.endpoint.id, "get_api_users_id");
}

#[test]
fn test_equal_score_tie_goes_to_first_registered() {
    let registry = registry();
    let mut first = test_endpoint(Method::GET, "/things/:a");
    first.id = "first".to_string();
    let mut second = test_endpoint(Method::GET, "/things/:b");
    second.id = "second".to_string();
    registry.register(first).expect("register");
    registry.register(second).expect("register");

    let found = registry.get_by_path("/things/x", &Method::GET).expect("match");
    assert_eq!(found.endpoint.id, "first");
}

#[test]
fn test_method_scoping() {
    let registry = registry();
    registry
        .register(test_endpoint(Method::GET, "/api/users"))
        .expect("register");
    assert!(registry.get_by_path("/api/users", &Method::POST).is_none());
}

#[test]
fn test_trailing_slash_normalization() {
    let registry = registry();
    registry
        .register(test_endpoint(Method::GET, "/api/users/:id"))
        .expect("register");
    let found = registry
        .get_by_path("/api/users/123/", &Method::GET)
        .expect("trailing slash should normalize");
    assert_eq!(found.params[0].1, "123");
}

#[test]
fn test_strict_trailing_slash() {
    let registry = EndpointRegistry::new(RegistryConfig {
        trailing_slash: TrailingSlash::Strict,
        ..RegistryConfig::default()
    });
    registry
        .register(test_endpoint(Method::GET, "/api/users"))
        .expect("register");
    assert!(registry.get_by_path("/api/users", &Method::GET).is_some());
    assert!(registry.get_by_path("/api/users/", &Method::GET).is_none());
}

#[test]
fn test_update_invalidates_cached_old_path() {
    let registry = registry();
    registry
        .register(test_endpoint(Method::GET, "/api/reports"))
        .expect("register");

    // Prime the cache with a hit on the old path and a miss on the new one.
    assert!(registry.get_by_path("/api/reports", &Method::GET).is_some());
    assert!(registry.get_by_path("/api/analytics", &Method::GET).is_none());

    // Same id, new path.
    let mut moved = test_endpoint(Method::GET, "/api/analytics");
    moved.id = "get_api_reports".to_string();
    registry.update(moved).expect("update");

    assert!(
        registry.get_by_path("/api/reports", &Method::GET).is_none(),
        "old path must stop matching even though it was cached"
    );
    let found = registry
        .get_by_path("/api/analytics", &Method::GET)
        .expect("new path must match even though a miss was cached");
    assert_eq!(found.endpoint.id, "get_api_reports");
}

#[test]
fn test_reregister_same_id_replaces_matcher() {
    let registry = registry();
    registry
        .register(test_endpoint(Method::GET, "/v1/items"))
        .expect("register");
    let mut replacement = test_endpoint(Method::GET, "/v2/items");
    replacement.id = "get_v1_items".to_string();
    registry.register(replacement).expect("register");

    assert_eq!(registry.len(), 1);
    assert!(registry.get_by_path("/v1/items", &Method::GET).is_none());
    assert!(registry.get_by_path("/v2/items", &Method::GET).is_some());
}

#[test]
fn test_misses_are_cached() {
    let registry = registry();
    registry
        .register(test_endpoint(Method::GET, "/api/users"))
        .expect("register");

    assert!(registry.get_by_path("/api/nothing", &Method::GET).is_none());
    assert!(registry.get_by_path("/api/nothing", &Method::GET).is_none());
    let stats = registry.stats();
    assert_eq!(stats.cache_hits, 1, "second miss should come from cache");
}

#[test]
fn test_cache_eviction_is_bounded() {
    let registry = EndpointRegistry::new(RegistryConfig {
        max_cache_entries: 4,
        ..RegistryConfig::default()
    });
    registry
        .register(test_endpoint(Method::GET, "/api/users/:id"))
        .expect("register");

    for i in 0..20 {
        let _ = registry.get_by_path(&format!("/api/users/{i}"), &Method::GET);
    }
    assert!(registry.stats().cache_entries <= 4);
}

#[test]
fn test_batch_registration_clears_cache() {
    let registry = registry();
    registry
        .register(test_endpoint(Method::GET, "/api/a"))
        .expect("register");
    assert!(registry.get_by_path("/api/b", &Method::GET).is_none());

    registry
        .register_batch(vec![
            test_endpoint(Method::GET, "/api/b"),
            test_endpoint(Method::GET, "/api/c"),
        ])
        .expect("batch");

    assert!(
        registry.get_by_path("/api/b", &Method::GET).is_some(),
        "batch registration must not leave a stale cached miss"
    );
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_events_fire_per_operation() {
    let registry = registry();
    let seen: Arc<std::sync::Mutex<Vec<RegistryEventType>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    registry.subscribe(move |event| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(event.event_type);
        }
    });

    registry
        .register(test_endpoint(Method::GET, "/api/users"))
        .expect("register");
    let mut updated = test_endpoint(Method::GET, "/api/members");
    updated.id = "get_api_users".to_string();
    registry.update(updated).expect("update");
    registry.unregister("get_api_users");
    registry
        .register_batch(vec![test_endpoint(Method::GET, "/api/a")])
        .expect("batch");
    registry.clear();

    let seen = seen.lock().expect("lock");
    assert_eq!(
        *seen,
        vec![
            RegistryEventType::Registered,
            RegistryEventType::Updated,
            RegistryEventType::Unregistered,
            RegistryEventType::BatchRegistered,
            RegistryEventType::Cleared,
        ]
    );
}

#[test]
fn test_panicking_listener_is_isolated() {
    let registry = registry();
    let delivered = Arc::new(AtomicUsize::new(0));

    registry.subscribe(|_| panic!("bad subscriber"));
    let counter = Arc::clone(&delivered);
    registry.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry
        .register(test_endpoint(Method::GET, "/api/users"))
        .expect("register must survive a panicking listener");
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let registry = registry();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let id = registry.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry
        .register(test_endpoint(Method::GET, "/api/a"))
        .expect("register");
    assert!(registry.unsubscribe(id));
    registry
        .register(test_endpoint(Method::GET, "/api/b"))
        .expect("register");
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[test]
fn test_tag_and_resource_queries() {
    let registry = registry();
    let mut users = test_endpoint(Method::GET, "/api/users");
    users.tags = vec!["users".to_string()];
    let mut posts = test_endpoint(Method::GET, "/api/posts");
    posts.tags = vec!["posts".to_string()];
    registry.register(users).expect("register");
    registry.register(posts).expect("register");

    assert_eq!(registry.get_by_tag("users").len(), 1);
    assert_eq!(registry.get_by_resource("posts").len(), 1);
    assert!(registry.get_by_tag("absent").is_empty());
}

#[test]
fn test_unknown_id_lookup_is_explicit_not_found() {
    let registry = registry();
    assert!(registry.get("missing").is_none());
    let result = registry.check_access("missing", None, None);
    assert!(!result.allowed);
    assert_eq!(result.decision, AccessDecision::Deny);
    assert!(result.reason.contains("not found"));
}

#[test]
fn test_default_access_check_without_rbac() {
    let registry = registry();
    let mut secured = test_endpoint(Method::GET, "/api/private");
    secured.access.requires_auth = true;
    registry.register(secured).expect("register");
    registry
        .register(test_endpoint(Method::GET, "/api/open"))
        .expect("register");

    let anonymous = registry.check_access("get_api_private", None, None);
    assert_eq!(anonymous.decision, AccessDecision::RequiresAuth);

    let user = UserContext::authenticated("u1", vec![]);
    let authed = registry.check_access("get_api_private", Some(&user), None);
    assert!(authed.allowed);

    let open = registry.check_access("get_api_open", None, None);
    assert!(open.allowed);
}

#[test]
fn test_default_registry_lifecycle() {
    reset_default();
    assert!(default_registry().is_none());

    let installed = init_default(EndpointRegistry::new(RegistryConfig::default()));
    installed
        .register(test_endpoint(Method::GET, "/api/users"))
        .expect("register");

    let fetched = default_registry().expect("default registry installed");
    assert_eq!(fetched.len(), 1);

    reset_default();
    assert!(default_registry().is_none());
}
