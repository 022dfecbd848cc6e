mod common;

use common::{fixture_tree, scan, write};
use http::Method;
use std::time::Duration;
use trailhead::scanner::{ScanCache, Scanner, ScannerConfig};
use trailhead::segment::GroupModifierType;

fn urls(routes: &[trailhead::ScannedRoute]) -> Vec<String> {
    routes.iter().map(|r| r.url_path.clone()).collect()
}

#[test]
fn test_scan_discovers_expected_routes() {
    let dir = fixture_tree();
    let routes = scan(dir.path());
    let urls = urls(&routes);

    for expected in [
        "/",
        "/users",
        "/users/new",
        "/users/search",
        "/users/:id",
        "/orgs/:org_id/teams/:team_id",
        "/posts/:year/:month?",
        "/docs/*slug",
        "/health",
        "/settings",
    ] {
        assert!(urls.contains(&expected.to_string()), "missing {expected}");
    }
}

#[test]
fn test_private_directories_are_skipped() {
    let dir = fixture_tree();
    let routes = scan(dir.path());
    assert!(
        !urls(&routes).iter().any(|u| u.contains("debug")),
        "routes under _internal must not be emitted"
    );
}

#[test]
fn test_scan_is_deterministic() {
    let dir = fixture_tree();
    let first = scan(dir.path());
    let second = scan(dir.path());
    assert_eq!(urls(&first), urls(&second));
    let methods = |routes: &[trailhead::ScannedRoute]| -> Vec<Vec<Method>> {
        routes.iter().map(|r| r.http_methods.clone()).collect()
    };
    assert_eq!(methods(&first), methods(&second));
}

#[test]
fn test_output_sorted_by_depth_then_path() {
    let dir = fixture_tree();
    let routes = scan(dir.path());
    let keys: Vec<(usize, String)> = routes
        .iter()
        .map(|r| (r.depth, r.url_path.clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted, "scanner output must be depth-then-path sorted");
    assert_eq!(routes[0].url_path, "/");
}

#[test]
fn test_resource_classification_and_methods() {
    let dir = fixture_tree();
    let routes = scan(dir.path());

    let resource = routes.iter().find(|r| r.url_path == "/users/:id").expect("resource route");
    assert_eq!(
        resource.http_methods,
        vec![Method::GET, Method::PUT, Method::PATCH, Method::DELETE]
    );

    let collection = routes.iter().find(|r| r.url_path == "/users").expect("collection route");
    assert_eq!(collection.http_methods, vec![Method::GET, Method::POST]);

    let action = routes.iter().find(|r| r.url_path == "/users/search").expect("action route");
    assert_eq!(action.http_methods, vec![Method::GET]);
}

#[test]
fn test_marker_files_flag_same_directory_routes() {
    let dir = fixture_tree();
    let routes = scan(dir.path());

    for url in ["/users", "/users/:id", "/users/new"] {
        let route = routes.iter().find(|r| r.url_path == url).expect("route");
        assert!(route.has_schema, "{url} should see the _schema marker");
        assert!(!route.has_access_override);
    }

    let settings = routes.iter().find(|r| r.url_path == "/settings").expect("settings route");
    assert!(settings.has_access_override);
    assert!(settings.access_file.is_some());

    // Marker files never become routes themselves.
    assert!(!urls(&routes).iter().any(|u| u.contains("_schema")));
}

#[test]
fn test_group_modifiers_collected_in_order() {
    let dir = fixture_tree();
    let routes = scan(dir.path());

    let health = routes.iter().find(|r| r.url_path == "/health").expect("health route");
    assert_eq!(health.group_modifiers.len(), 1);
    assert_eq!(
        health.group_modifiers[0].modifier_type,
        GroupModifierType::Public
    );

    let settings = routes.iter().find(|r| r.url_path == "/settings").expect("settings route");
    assert_eq!(
        settings.group_modifiers[0].modifier_type,
        GroupModifierType::Role
    );
    assert_eq!(settings.group_modifiers[0].value.as_deref(), Some("admin"));
}

#[test]
fn test_nested_resource_names() {
    let dir = fixture_tree();
    let routes = scan(dir.path());
    let teams = routes
        .iter()
        .find(|r| r.url_path == "/orgs/:org_id/teams/:team_id")
        .expect("teams route");
    assert_eq!(teams.resource_name, "teams");
    assert_eq!(teams.parent_resources, vec!["orgs".to_string()]);
    assert_eq!(teams.param_names, vec!["org_id".to_string(), "team_id".to_string()]);
}

#[test]
fn test_ignore_globs_exclude_files() {
    let dir = fixture_tree();
    let mut config = ScannerConfig::new(dir.path());
    config.ignore_globs = vec!["**/search.*".to_string()];
    let routes = Scanner::new(config).scan().expect("scan");
    assert!(!urls(&routes).contains(&"/users/search".to_string()));
    assert!(urls(&routes).contains(&"/users/new".to_string()));
}

#[test]
fn test_base_path_prefixes_urls() {
    let dir = fixture_tree();
    let mut config = ScannerConfig::new(dir.path());
    config.base_path = "/api".to_string();
    let routes = Scanner::new(config).scan().expect("scan");
    assert!(urls(&routes).contains(&"/api/users/:id".to_string()));
}

#[test]
fn test_foreign_extensions_are_not_routes() {
    let dir = fixture_tree();
    write(dir.path(), "users/notes.txt", "not a route");
    let routes = scan(dir.path());
    assert!(!urls(&routes).iter().any(|u| u.contains("notes")));
}

#[test]
fn test_scan_cache_serves_within_ttl_and_invalidates() {
    let dir = fixture_tree();
    let scanner = Scanner::new(ScannerConfig::new(dir.path()));
    let cache = ScanCache::new(Duration::from_secs(60));

    let first = cache.scan(&scanner).expect("scan");
    let second = cache.scan(&scanner).expect("scan");
    assert_eq!(first.len(), second.len());
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    // Prefix invalidation forces a fresh walk.
    assert_eq!(cache.invalidate_root(dir.path()), 1);
    let _ = cache.scan(&scanner).expect("scan");
    assert_eq!(cache.stats().misses, 2);
}

#[test]
fn test_scan_cache_distinguishes_configs() {
    let dir = fixture_tree();
    let cache = ScanCache::new(Duration::from_secs(60));

    let plain = Scanner::new(ScannerConfig::new(dir.path()));
    let mut prefixed_config = ScannerConfig::new(dir.path());
    prefixed_config.base_path = "/api".to_string();
    let prefixed = Scanner::new(prefixed_config);

    let _ = cache.scan(&plain).expect("scan");
    let _ = cache.scan(&prefixed).expect("scan");
    assert_eq!(cache.stats().entries, 2);
    assert_eq!(cache.stats().misses, 2);
}

#[test]
fn test_deadline_returns_partial_result() {
    let dir = fixture_tree();
    let mut config = ScannerConfig::new(dir.path());
    config.deadline = Some(Duration::ZERO);
    let routes = Scanner::new(config).scan().expect("scan");
    // The zero budget stops the walk immediately; whatever was collected is
    // returned instead of an error.
    assert!(routes.len() < 10);
}
