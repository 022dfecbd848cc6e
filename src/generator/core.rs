use super::access::{fold_group_modifiers, merge_override, ComputedAccess};
use crate::handler::HandlerSlot;
use crate::middleware::MiddlewareRef;
use crate::resolve::{
    AccessResolver, HandlerResolver, MiddlewareResolver, QueryParamMeta, SchemaResolver,
};
use crate::scanner::{RouteFileType, ScannedRoute};
use crate::segment::SegmentType;
use anyhow::Context;
use http::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Path parameter descriptor on a generated endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParamMeta {
    /// Parameter name as written in the pattern
    pub name: String,
    /// Whether a matching URL must bind this parameter
    pub required: bool,
    /// Whether the parameter spans the remainder of the path
    pub catch_all: bool,
}

/// The unit of registration: one HTTP operation on one URL pattern.
#[derive(Debug, Clone)]
pub struct GeneratedEndpoint {
    /// Deterministic identifier: `lower(method) + "_" + sanitized(path)`
    pub id: String,
    /// HTTP method
    pub method: Method,
    /// URL pattern (e.g., `/api/users/:id`)
    pub path: String,
    /// Fully-resolved access requirements
    pub access: ComputedAccess,
    /// Lazily-bound handler
    pub handler: HandlerSlot,
    /// Path parameter descriptors in pattern order
    pub path_params: Vec<PathParamMeta>,
    /// Query parameter descriptors from the schema marker, if any
    pub query_params: Vec<QueryParamMeta>,
    /// Request body schema scoped to this method
    pub request_schema: Option<Value>,
    /// Response body schema scoped to this method
    pub response_schema: Option<Value>,
    /// Ordered middleware chain
    pub middleware: Vec<MiddlewareRef>,
    /// Grouping tags (the resource name)
    pub tags: Vec<String>,
    /// Camel-case operation id for the produced OpenAPI document
    pub operation_id: String,
    /// Short display name
    pub summary: String,
    /// Longer display description
    pub description: String,
    /// Route file this endpoint was generated from
    pub source_file: PathBuf,
}

/// Derive the deterministic endpoint identifier from method and path.
///
/// `/api/users/:id` + GET → `get_api_users_id`. Identifiers are unique per
/// registry; re-registering an id replaces the prior endpoint.
#[must_use]
pub fn endpoint_id(method: &Method, path: &str) -> String {
    let mut sanitized = String::with_capacity(path.len());
    let mut boundary = true;
    for c in path.chars() {
        if c.is_ascii_alphanumeric() {
            sanitized.push(c.to_ascii_lowercase());
            boundary = false;
        } else if !boundary {
            sanitized.push('_');
            boundary = true;
        }
    }
    while sanitized.ends_with('_') {
        sanitized.pop();
    }
    if sanitized.is_empty() {
        sanitized.push_str("root");
    }
    format!("{}_{}", method.as_str().to_ascii_lowercase(), sanitized)
}

/// Lower-camel form of an endpoint id, used as the OpenAPI operation id.
fn operation_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for (i, part) in id.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// Fixed per-method display template table.
fn display_metadata(method: &Method, resource: &str, is_collection: bool) -> (String, String) {
    match (method.as_str(), is_collection) {
        ("GET", true) => (
            format!("List {resource}"),
            format!("Retrieve the collection of {resource}."),
        ),
        ("GET", false) => (
            format!("Get {resource}"),
            format!("Retrieve a single {resource} entry by its identifier."),
        ),
        ("POST", _) => (
            format!("Create {resource}"),
            format!("Create a new {resource} entry."),
        ),
        ("PUT", _) => (
            format!("Replace {resource}"),
            format!("Replace an existing {resource} entry."),
        ),
        ("PATCH", _) => (
            format!("Update {resource}"),
            format!("Apply a partial update to a {resource} entry."),
        ),
        ("DELETE", _) => (
            format!("Delete {resource}"),
            format!("Delete a {resource} entry."),
        ),
        (other, _) => (
            format!("{other} {resource}"),
            format!("{other} operation on {resource}."),
        ),
    }
}

/// Turns scanned routes into registrable endpoints.
///
/// Schema, middleware, and access markers resolve eagerly — they shape the
/// generated endpoint. Handler binding is always lazy; a missing handler
/// only surfaces when the endpoint is invoked.
pub struct EndpointGenerator {
    handler_resolver: Arc<dyn HandlerResolver>,
    schema_resolver: Option<Arc<dyn SchemaResolver>>,
    middleware_resolver: Option<Arc<dyn MiddlewareResolver>>,
    access_resolver: Option<Arc<dyn AccessResolver>>,
}

impl EndpointGenerator {
    /// Generator with only handler resolution configured.
    #[must_use]
    pub fn new(handler_resolver: Arc<dyn HandlerResolver>) -> Self {
        Self {
            handler_resolver,
            schema_resolver: None,
            middleware_resolver: None,
            access_resolver: None,
        }
    }

    #[must_use]
    pub fn with_schema_resolver(mut self, resolver: Arc<dyn SchemaResolver>) -> Self {
        self.schema_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_middleware_resolver(mut self, resolver: Arc<dyn MiddlewareResolver>) -> Self {
        self.middleware_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_access_resolver(mut self, resolver: Arc<dyn AccessResolver>) -> Self {
        self.access_resolver = Some(resolver);
        self
    }

    /// Generate one endpoint per supported HTTP method of a scanned route.
    ///
    /// # Errors
    ///
    /// Fails when a declared marker cannot be resolved: schema, middleware,
    /// and access problems are generation-time errors because they change
    /// the endpoint's shape.
    pub fn generate(&self, route: &ScannedRoute) -> anyhow::Result<Vec<GeneratedEndpoint>> {
        let access = self.compute_access(route)?;
        let schemas = self.resolve_schemas(route)?;
        let middleware = self.resolve_middleware(route)?;
        let path_params = path_params(route);
        let is_collection = route.file_type != RouteFileType::Resource;
        let resource = if route.resource_name.is_empty() {
            "root"
        } else {
            route.resource_name.as_str()
        };

        let endpoints = route
            .http_methods
            .iter()
            .map(|method| {
                let id = endpoint_id(method, &route.url_path);
                let (summary, description) = display_metadata(method, resource, is_collection);
                let method_schemas = schemas.as_ref().and_then(|b| b.for_method(method));
                let export_name = method.as_str().to_ascii_lowercase();
                debug!(
                    endpoint_id = %id,
                    method = %method,
                    path = %route.url_path,
                    "Generated endpoint"
                );
                GeneratedEndpoint {
                    operation_id: operation_id(&id),
                    id,
                    method: method.clone(),
                    path: route.url_path.clone(),
                    access: access.clone(),
                    handler: HandlerSlot::pending(
                        Arc::clone(&self.handler_resolver),
                        route.file_path.clone(),
                        export_name,
                    ),
                    path_params: path_params.clone(),
                    query_params: method_schemas
                        .map(|s| s.query_params.clone())
                        .unwrap_or_default(),
                    request_schema: method_schemas.and_then(|s| s.request.clone()),
                    response_schema: method_schemas.and_then(|s| s.response.clone()),
                    middleware: middleware.clone(),
                    tags: vec![resource.to_string()],
                    summary,
                    description,
                    source_file: route.file_path.clone(),
                }
            })
            .collect();
        Ok(endpoints)
    }

    /// Generate endpoints for every scanned route.
    ///
    /// # Errors
    ///
    /// Propagates the first generation failure with the offending route
    /// named in the error context.
    pub fn generate_all(
        &self,
        routes: &[ScannedRoute],
    ) -> anyhow::Result<Vec<GeneratedEndpoint>> {
        let mut endpoints = Vec::new();
        for route in routes {
            let generated = self
                .generate(route)
                .with_context(|| format!("failed to generate endpoints for {}", route.url_path))?;
            endpoints.extend(generated);
        }
        Ok(endpoints)
    }

    fn compute_access(&self, route: &ScannedRoute) -> anyhow::Result<ComputedAccess> {
        let folded = fold_group_modifiers(&route.group_modifiers, &route.resource_name);
        if !route.has_access_override {
            return Ok(folded);
        }
        let file = route
            .access_file
            .as_ref()
            .with_context(|| format!("route {} lost its access marker path", route.url_path))?;
        let resolver = self.access_resolver.as_ref().with_context(|| {
            format!(
                "route {} declares an access override but no access resolver is configured",
                route.url_path
            )
        })?;
        let over = resolver
            .resolve(file)
            .with_context(|| format!("failed to resolve access override for {}", route.url_path))?;
        Ok(merge_override(&folded, &over))
    }

    fn resolve_schemas(
        &self,
        route: &ScannedRoute,
    ) -> anyhow::Result<Option<crate::resolve::SchemaBundle>> {
        if !route.has_schema {
            return Ok(None);
        }
        let file = route
            .schema_file
            .as_ref()
            .with_context(|| format!("route {} lost its schema marker path", route.url_path))?;
        let resolver = self.schema_resolver.as_ref().with_context(|| {
            format!(
                "route {} declares a schema but no schema resolver is configured",
                route.url_path
            )
        })?;
        let bundle = resolver
            .resolve(file)
            .with_context(|| format!("failed to resolve schema for {}", route.url_path))?;
        Ok(Some(bundle))
    }

    fn resolve_middleware(&self, route: &ScannedRoute) -> anyhow::Result<Vec<MiddlewareRef>> {
        if !route.has_middleware {
            return Ok(Vec::new());
        }
        let file = route
            .middleware_file
            .as_ref()
            .with_context(|| format!("route {} lost its middleware marker path", route.url_path))?;
        let resolver = self.middleware_resolver.as_ref().with_context(|| {
            format!(
                "route {} declares middleware but no middleware resolver is configured",
                route.url_path
            )
        })?;
        let resolved = resolver
            .resolve(file)
            .with_context(|| format!("failed to resolve middleware for {}", route.url_path))?;
        Ok(resolved
            .into_iter()
            .enumerate()
            .map(|(priority, (name, inner))| MiddlewareRef {
                name,
                priority,
                inner,
            })
            .collect())
    }
}

fn path_params(route: &ScannedRoute) -> Vec<PathParamMeta> {
    route
        .segments
        .iter()
        .filter_map(|segment| {
            let name = segment.param_name.clone()?;
            match segment.segment_type {
                SegmentType::Dynamic => Some(PathParamMeta {
                    name,
                    required: true,
                    catch_all: false,
                }),
                SegmentType::Optional => Some(PathParamMeta {
                    name,
                    required: false,
                    catch_all: false,
                }),
                SegmentType::CatchAll => Some(PathParamMeta {
                    name,
                    required: !segment.is_optional,
                    catch_all: true,
                }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_id_sanitization() {
        assert_eq!(endpoint_id(&Method::GET, "/api/users/:id"), "get_api_users_id");
        assert_eq!(endpoint_id(&Method::POST, "/api/users"), "post_api_users");
        assert_eq!(endpoint_id(&Method::GET, "/"), "get_root");
        assert_eq!(endpoint_id(&Method::GET, "/files/*rest"), "get_files_rest");
    }

    #[test]
    fn test_operation_id_lower_camel() {
        assert_eq!(operation_id("get_api_users_id"), "getApiUsersId");
        assert_eq!(operation_id("post_users"), "postUsers");
    }

    #[test]
    fn test_display_metadata_table() {
        let (summary, _) = display_metadata(&Method::GET, "users", true);
        assert_eq!(summary, "List users");
        let (summary, _) = display_metadata(&Method::GET, "users", false);
        assert_eq!(summary, "Get users");
        let (summary, _) = display_metadata(&Method::DELETE, "users", false);
        assert_eq!(summary, "Delete users");
    }
}
