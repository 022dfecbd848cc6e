mod common;

use common::{endpoint, fixture_endpoints, fixture_tree, scan, write};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use trailhead::generator::{CheckStrategy, EndpointGenerator};
use trailhead::handler::{HandlerBinding, HandlerRequest, HandlerResponse};
use trailhead::resolve::{FsAccessResolver, FsSchemaResolver, NamedHandlerRegistry};

#[test]
fn test_one_endpoint_per_route_method() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());

    let user_ids: Vec<&str> = endpoints
        .iter()
        .filter(|e| e.path == "/users/:id")
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(
        user_ids,
        vec![
            "get_users_id",
            "put_users_id",
            "patch_users_id",
            "delete_users_id"
        ]
    );
}

#[test]
fn test_display_metadata_per_method() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());

    assert_eq!(endpoint(&endpoints, "get_users").summary, "List users");
    assert_eq!(endpoint(&endpoints, "post_users").summary, "Create users");
    assert_eq!(endpoint(&endpoints, "get_users_id").summary, "Get users");
    assert_eq!(
        endpoint(&endpoints, "delete_users_id").summary,
        "Delete users"
    );
    assert_eq!(
        endpoint(&endpoints, "get_users").operation_id,
        "getUsers"
    );
}

#[test]
fn test_schema_binding_scoped_to_method() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());

    let list = endpoint(&endpoints, "get_users");
    assert_eq!(list.response_schema, Some(json!({ "type": "array" })));
    assert!(list.request_schema.is_none());
    assert_eq!(list.query_params.len(), 1);
    assert_eq!(list.query_params[0].name, "limit");

    let create = endpoint(&endpoints, "post_users");
    assert_eq!(
        create.request_schema,
        Some(json!({ "type": "object", "required": ["name"] }))
    );
    assert!(create.query_params.is_empty());

    // PUT has no entry in the marker: no schemas bound.
    let replace = endpoint(&endpoints, "put_users_id");
    assert!(replace.request_schema.is_none());
    assert!(replace.response_schema.is_none());
}

#[test]
fn test_group_access_folding() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());

    let health = endpoint(&endpoints, "get_health");
    assert!(health.access.is_public);
    assert!(!health.access.requires_auth);

    let settings = endpoint(&endpoints, "get_settings");
    assert!(settings.access.requires_auth);
    assert_eq!(settings.access.required_roles, vec!["admin".to_string()]);
}

#[test]
fn test_access_override_merges_field_by_field() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());

    let settings = endpoint(&endpoints, "get_settings");
    // From the override file:
    assert_eq!(
        settings.access.required_permissions,
        vec!["settings:manage".to_string()]
    );
    assert_eq!(settings.access.permission_strategy, CheckStrategy::All);
    // Preserved from the (admin) group fold:
    assert_eq!(settings.access.required_roles, vec!["admin".to_string()]);
    assert!(settings
        .access
        .overrides
        .contains(&"requiredPermissions".to_string()));
}

#[test]
fn test_override_public_wins_over_group_auth() {
    let dir = fixture_tree();
    write(
        dir.path(),
        "(admin)/reports/index.rs",
        "",
    );
    write(
        dir.path(),
        "(admin)/reports/_access.json",
        &json!({ "isPublic": true }).to_string(),
    );

    let endpoints = fixture_endpoints(dir.path());
    let reports = endpoint(&endpoints, "get_reports");
    assert!(reports.access.is_public);
    assert!(!reports.access.requires_auth, "override must win per field");
    // The role list from the group fold survives untouched.
    assert_eq!(reports.access.required_roles, vec!["admin".to_string()]);
}

#[test]
fn test_path_params_from_segments() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());

    let teams = endpoint(&endpoints, "get_orgs_org_id_teams_team_id");
    let names: Vec<(&str, bool)> = teams
        .path_params
        .iter()
        .map(|p| (p.name.as_str(), p.required))
        .collect();
    assert_eq!(names, vec![("org_id", true), ("team_id", true)]);

    let posts = endpoint(&endpoints, "get_posts_year_month");
    assert!(posts.path_params.iter().any(|p| p.name == "month" && !p.required));

    let docs = endpoint(&endpoints, "get_docs_slug");
    assert!(docs.path_params[0].catch_all);
}

#[test]
fn test_handler_binding_is_lazy_and_sticky() {
    let dir = fixture_tree();
    let routes = scan(dir.path());

    // Empty registry: generation succeeds, invocation fails.
    let generator = EndpointGenerator::new(Arc::new(NamedHandlerRegistry::new()))
        .with_schema_resolver(Arc::new(FsSchemaResolver))
        .with_access_resolver(Arc::new(FsAccessResolver));
    let endpoints = generator.generate_all(&routes).expect("generate");
    let list = endpoint(&endpoints, "get_users");

    assert!(matches!(list.handler.binding(), HandlerBinding::Pending { .. }));

    let request = HandlerRequest {
        method: Method::GET,
        path: "/users".to_string(),
        path_params: Default::default(),
        query_params: Default::default(),
        body: None,
    };
    let err = list.handler.invoke(request.clone()).expect_err("missing handler");
    assert!(err.to_string().contains("handler not found"));
    assert!(matches!(list.handler.binding(), HandlerBinding::Failed(_)));
}

#[test]
fn test_resolved_handler_invokes() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());
    let list = endpoint(&endpoints, "get_users");

    let request = HandlerRequest {
        method: Method::GET,
        path: "/users".to_string(),
        path_params: Default::default(),
        query_params: Default::default(),
        body: None,
    };
    let response: HandlerResponse = list.handler.invoke(request).expect("invoke");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({ "path": "/users" }));
    assert!(matches!(list.handler.binding(), HandlerBinding::Resolved(_)));
}

#[test]
fn test_malformed_access_marker_fails_generation() {
    let dir = fixture_tree();
    write(dir.path(), "broken/index.rs", "");
    write(dir.path(), "broken/_access.json", "{ not json");

    let routes = scan(dir.path());
    let err = common::echo_generator()
        .generate_all(&routes)
        .expect_err("generation must fail eagerly");
    assert!(err.to_string().contains("/broken"));
}

#[test]
fn test_schema_marker_without_resolver_fails() {
    let dir = fixture_tree();
    let routes = scan(dir.path());
    // Access resolution configured, schema resolution deliberately absent.
    let generator = EndpointGenerator::new(Arc::new(NamedHandlerRegistry::new()))
        .with_access_resolver(Arc::new(FsAccessResolver));
    let err = generator.generate_all(&routes).expect_err("no schema resolver");
    assert!(format!("{err:#}").contains("no schema resolver is configured"));
}

#[test]
fn test_tags_carry_resource_name() {
    let dir = fixture_tree();
    let endpoints = fixture_endpoints(dir.path());
    assert_eq!(endpoint(&endpoints, "get_users").tags, vec!["users".to_string()]);
    assert_eq!(
        endpoint(&endpoints, "get_orgs_org_id_teams_team_id").tags,
        vec!["teams".to_string()]
    );
}
