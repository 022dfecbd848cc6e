//! Shared fixtures for integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use trailhead::generator::{EndpointGenerator, GeneratedEndpoint};
use trailhead::handler::HandlerResponse;
use trailhead::rbac::UserContext;
use trailhead::resolve::{
    FsAccessResolver, FsSchemaResolver, NamedHandlerRegistry, OwnershipChecker,
    PermissionChecker, RoleChecker,
};
use trailhead::scanner::{Scanner, ScannerConfig};

/// Build the canonical fixture routes tree:
///
/// ```text
/// routes/
/// ├── index.rs
/// ├── users/
/// │   ├── index.rs
/// │   ├── new.rs
/// │   ├── search.rs
/// │   ├── [id].rs
/// │   └── _schema.json
/// ├── orgs/
/// │   └── [org_id]/
/// │       └── teams/
/// │           └── [team_id].rs
/// ├── posts/
/// │   └── [year]/
/// │       └── [[month]]/
/// │           └── index.rs
/// ├── docs/
/// │   └── [...slug].rs
/// ├── (public)/
/// │   └── health/
/// │       └── index.rs
/// ├── (admin)/
/// │   └── settings/
/// │       ├── index.rs
/// │       └── _access.json
/// └── _internal/
///     └── debug.rs
/// ```
pub fn fixture_tree() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();

    write(root, "index.rs", "");
    write(root, "users/index.rs", "");
    write(root, "users/new.rs", "");
    write(root, "users/search.rs", "");
    write(root, "users/[id].rs", "");
    write(
        root,
        "users/_schema.json",
        &json!({
            "GET": {
                "response": { "type": "array" },
                "queryParams": [ { "name": "limit", "required": false } ]
            },
            "POST": {
                "request": { "type": "object", "required": ["name"] },
                "response": { "type": "object" }
            }
        })
        .to_string(),
    );
    write(root, "orgs/[org_id]/teams/[team_id].rs", "");
    write(root, "posts/[year]/[[month]]/index.rs", "");
    write(root, "docs/[...slug].rs", "");
    write(root, "(public)/health/index.rs", "");
    write(root, "(admin)/settings/index.rs", "");
    write(
        root,
        "(admin)/settings/_access.json",
        &json!({ "requiredPermissions": ["settings:manage"], "permissionStrategy": "all" })
            .to_string(),
    );
    write(root, "_internal/debug.rs", "");

    dir
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dirs");
    }
    fs::write(path, content).expect("write fixture file");
}

/// Scan the fixture tree with default configuration.
pub fn scan(root: &Path) -> Vec<trailhead::ScannedRoute> {
    Scanner::new(ScannerConfig::new(root)).scan().expect("scan")
}

/// A generator wired with echo handlers and the filesystem resolvers.
pub fn echo_generator() -> EndpointGenerator {
    let mut handlers = NamedHandlerRegistry::new();
    for export in ["get", "post", "put", "patch", "delete"] {
        handlers.register_export(
            export,
            Arc::new(|req: trailhead::handler::HandlerRequest| {
                HandlerResponse::ok_json(json!({ "path": req.path }))
            }),
        );
    }
    EndpointGenerator::new(Arc::new(handlers))
        .with_schema_resolver(Arc::new(FsSchemaResolver))
        .with_access_resolver(Arc::new(FsAccessResolver))
}

/// Generate the fixture tree's endpoints.
pub fn fixture_endpoints(root: &Path) -> Vec<GeneratedEndpoint> {
    let routes = scan(root);
    echo_generator().generate_all(&routes).expect("generate")
}

/// Find one endpoint by id.
pub fn endpoint<'a>(endpoints: &'a [GeneratedEndpoint], id: &str) -> &'a GeneratedEndpoint {
    endpoints
        .iter()
        .find(|e| e.id == id)
        .unwrap_or_else(|| panic!("endpoint {id} not generated"))
}

/// A hand-built endpoint for registry-level tests.
pub fn test_endpoint(method: http::Method, path: &str) -> GeneratedEndpoint {
    use trailhead::generator::{endpoint_id, ComputedAccess};
    use trailhead::handler::HandlerSlot;

    let id = endpoint_id(&method, path);
    GeneratedEndpoint {
        operation_id: id.clone(),
        id,
        method,
        path: path.to_string(),
        access: ComputedAccess::default(),
        handler: HandlerSlot::resolved(Arc::new(|req: trailhead::handler::HandlerRequest| {
            HandlerResponse::ok_json(json!({ "path": req.path }))
        })),
        path_params: Vec::new(),
        query_params: Vec::new(),
        request_schema: None,
        response_schema: None,
        middleware: Vec::new(),
        tags: vec!["test".to_string()],
        summary: String::new(),
        description: String::new(),
        source_file: std::path::PathBuf::new(),
    }
}

/// Permission checker backed by a static user → permissions table.
pub struct StaticPermissionChecker {
    grants: HashMap<String, Vec<String>>,
}

impl StaticPermissionChecker {
    pub fn new(grants: &[(&str, &[&str])]) -> Self {
        Self {
            grants: grants
                .iter()
                .map(|(user, perms)| {
                    (
                        user.to_string(),
                        perms.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl PermissionChecker for StaticPermissionChecker {
    fn check(
        &self,
        user: &UserContext,
        permission: &str,
        _context: Option<&Value>,
    ) -> anyhow::Result<bool> {
        Ok(self
            .grants
            .get(&user.id)
            .is_some_and(|perms| perms.iter().any(|p| p == permission)))
    }
}

/// Role checker backed by the user's own roles.
pub struct StaticRoleChecker;

impl RoleChecker for StaticRoleChecker {
    fn check(&self, user: &UserContext, role: &str) -> anyhow::Result<bool> {
        Ok(user.roles.iter().any(|r| r == role))
    }
}

/// Checker that always errors, for failure-posture tests.
pub struct FailingChecker;

impl PermissionChecker for FailingChecker {
    fn check(&self, _: &UserContext, _: &str, _: Option<&Value>) -> anyhow::Result<bool> {
        anyhow::bail!("permission backend unavailable")
    }
}

impl RoleChecker for FailingChecker {
    fn check(&self, _: &UserContext, _: &str) -> anyhow::Result<bool> {
        anyhow::bail!("role backend unavailable")
    }
}

/// Ownership checker where user `owner-1` owns everything and nobody else
/// owns anything.
pub struct StaticOwnershipChecker;

impl OwnershipChecker for StaticOwnershipChecker {
    fn check(
        &self,
        user: &UserContext,
        _resource_type: &str,
        _resource_id: &str,
        _owner_field: &str,
    ) -> anyhow::Result<bool> {
        Ok(user.id == "owner-1")
    }
}
