//! # Resolver Interfaces
//!
//! Trailhead consumes its external collaborators through narrow injected
//! traits: handler lookup, schema/middleware/access marker resolution, and
//! the permission/role/ownership checks evaluated by the RBAC engine.
//!
//! Default implementations are provided for the common cases: an in-memory
//! named-handler registry, filesystem resolvers that parse JSON or YAML
//! marker files, and checkers that evaluate the caller's own roles/claims.
//! Anything heavier (database-backed permission stores, remote policy
//! services) implements the same traits and is registered in their place.

use crate::generator::AccessOverride;
use crate::handler::HandlerFn;
use crate::middleware::Middleware;
use crate::rbac::UserContext;
use anyhow::Context;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Resolves a handler function from a route file and per-method export name.
///
/// Returning `None` means "handler not found"; the error surfaces when the
/// endpoint is invoked, never at generation time.
pub trait HandlerResolver: Send + Sync {
    fn resolve(&self, file_path: &Path, export_name: &str) -> Option<HandlerFn>;
}

/// Query parameter descriptor declared in a `_schema` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParamMeta {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request/response schemas and query descriptors for one HTTP method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSchemas {
    #[serde(default)]
    pub request: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub query_params: Vec<QueryParamMeta>,
}

/// Contents of a `_schema` marker, keyed by uppercase HTTP method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaBundle(pub HashMap<String, MethodSchemas>);

impl SchemaBundle {
    /// Schemas scoped to one HTTP method.
    #[must_use]
    pub fn for_method(&self, method: &Method) -> Option<&MethodSchemas> {
        self.0.get(method.as_str())
    }
}

/// Resolves a `_schema` marker file into per-method schemas.
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, schema_file: &Path) -> anyhow::Result<SchemaBundle>;
}

/// Resolves a `_middleware` marker file into an ordered middleware list.
///
/// Order in the returned list is declaration order and becomes the bound
/// middleware priority.
pub trait MiddlewareResolver: Send + Sync {
    fn resolve(&self, middleware_file: &Path)
        -> anyhow::Result<Vec<(String, Arc<dyn Middleware>)>>;
}

/// Resolves an `_access` marker file into a partial access override.
pub trait AccessResolver: Send + Sync {
    fn resolve(&self, access_file: &Path) -> anyhow::Result<AccessOverride>;
}

/// Checks whether a caller holds one permission.
///
/// Errors are treated by the RBAC engine as a failed check, never as a fatal
/// evaluation error.
pub trait PermissionChecker: Send + Sync {
    fn check(
        &self,
        user: &UserContext,
        permission: &str,
        context: Option<&Value>,
    ) -> anyhow::Result<bool>;
}

/// Checks whether a caller holds one role.
pub trait RoleChecker: Send + Sync {
    fn check(&self, user: &UserContext, role: &str) -> anyhow::Result<bool>;
}

/// Checks whether a caller owns one resource instance.
pub trait OwnershipChecker: Send + Sync {
    fn check(
        &self,
        user: &UserContext,
        resource_type: &str,
        resource_id: &str,
        owner_field: &str,
    ) -> anyhow::Result<bool>;
}

/// In-memory handler registry.
///
/// Handlers register under `"<file stem>::<export>"` keys; a bare export key
/// acts as a catch-all for any file. Populate at startup, then share behind
/// an `Arc` as the generator's [`HandlerResolver`].
#[derive(Default)]
pub struct NamedHandlerRegistry {
    handlers: HashMap<String, HandlerFn>,
}

impl NamedHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific route file stem and export name.
    pub fn register(
        &mut self,
        file_stem: impl Into<String>,
        export_name: impl Into<String>,
        handler: HandlerFn,
    ) {
        self.handlers
            .insert(format!("{}::{}", file_stem.into(), export_name.into()), handler);
    }

    /// Register a handler serving an export name regardless of file.
    pub fn register_export(&mut self, export_name: impl Into<String>, handler: HandlerFn) {
        self.handlers.insert(export_name.into(), handler);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HandlerResolver for NamedHandlerRegistry {
    fn resolve(&self, file_path: &Path, export_name: &str) -> Option<HandlerFn> {
        let stem = file_path.file_stem().and_then(|s| s.to_str())?;
        self.handlers
            .get(&format!("{stem}::{export_name}"))
            .or_else(|| self.handlers.get(export_name))
            .map(Arc::clone)
    }
}

/// Parse a marker file as JSON or YAML based on its extension.
fn read_marker_value(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read marker file {}", path.display()))?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in marker file {}", path.display())),
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in marker file {}", path.display())),
        other => anyhow::bail!(
            "unsupported marker format .{other} for {}; use .json or .yaml",
            path.display()
        ),
    }
}

/// Schema resolver reading `_schema.{json,yaml}` marker files.
///
/// Method keys are case-insensitive in the file and normalized to uppercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSchemaResolver;

impl SchemaResolver for FsSchemaResolver {
    fn resolve(&self, schema_file: &Path) -> anyhow::Result<SchemaBundle> {
        let value = read_marker_value(schema_file)?;
        let map = value
            .as_object()
            .with_context(|| format!("schema marker {} is not an object", schema_file.display()))?;
        let mut bundle = SchemaBundle::default();
        for (method, schemas) in map {
            let schemas: MethodSchemas = serde_json::from_value(schemas.clone()).with_context(
                || format!("invalid schema entry {method:?} in {}", schema_file.display()),
            )?;
            bundle.0.insert(method.to_ascii_uppercase(), schemas);
        }
        Ok(bundle)
    }
}

/// Access resolver reading `_access.{json,yaml}` marker files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsAccessResolver;

impl AccessResolver for FsAccessResolver {
    fn resolve(&self, access_file: &Path) -> anyhow::Result<AccessOverride> {
        let value = read_marker_value(access_file)?;
        serde_json::from_value(value)
            .with_context(|| format!("invalid access override in {}", access_file.display()))
    }
}

/// Middleware resolver mapping declared names to registered implementations.
///
/// The marker file is a list of names (`["require_tenant", "audit_log"]`);
/// each name must have been registered up front. Unknown names fail
/// eagerly — a missing middleware changes endpoint behavior and must not be
/// discovered at request time.
#[derive(Default)]
pub struct NamedMiddlewareRegistry {
    middleware: HashMap<String, Arc<dyn Middleware>>,
}

impl NamedMiddlewareRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) {
        self.middleware.insert(name.into(), middleware);
    }
}

impl MiddlewareResolver for NamedMiddlewareRegistry {
    fn resolve(
        &self,
        middleware_file: &Path,
    ) -> anyhow::Result<Vec<(String, Arc<dyn Middleware>)>> {
        let value = read_marker_value(middleware_file)?;
        let names: Vec<String> = serde_json::from_value(value).with_context(|| {
            format!(
                "middleware marker {} is not a list of names",
                middleware_file.display()
            )
        })?;
        names
            .into_iter()
            .map(|name| {
                let middleware = self.middleware.get(&name).map(Arc::clone).with_context(|| {
                    format!(
                        "middleware {name:?} declared in {} is not registered",
                        middleware_file.display()
                    )
                })?;
                Ok((name, middleware))
            })
            .collect()
    }
}

/// Role checker evaluating the caller's own role list.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinRoleChecker;

impl RoleChecker for BuiltinRoleChecker {
    fn check(&self, user: &UserContext, role: &str) -> anyhow::Result<bool> {
        Ok(user.roles.iter().any(|r| r == role))
    }
}

/// Permission checker evaluating a claims array on the caller.
///
/// Looks up `claim` (default `permissions`) in the caller's claims and
/// checks membership.
#[derive(Debug, Clone)]
pub struct ClaimsPermissionChecker {
    claim: String,
}

impl Default for ClaimsPermissionChecker {
    fn default() -> Self {
        Self {
            claim: "permissions".to_string(),
        }
    }
}

impl ClaimsPermissionChecker {
    #[must_use]
    pub fn new(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
        }
    }
}

impl PermissionChecker for ClaimsPermissionChecker {
    fn check(
        &self,
        user: &UserContext,
        permission: &str,
        _context: Option<&Value>,
    ) -> anyhow::Result<bool> {
        let held = user
            .claims
            .as_ref()
            .and_then(|claims| claims.get(&self.claim))
            .and_then(Value::as_array)
            .is_some_and(|perms| perms.iter().any(|p| p.as_str() == Some(permission)));
        Ok(held)
    }
}
