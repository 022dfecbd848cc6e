//! OpenAPI document production.
//!
//! Builds an OpenAPI 3.1-shaped JSON document from the registered endpoint
//! set. Path patterns convert from `:param` to `{param}` style, every
//! endpoint becomes an operation under its method, and a bearer security
//! requirement is present exactly on the operations that require
//! authentication. The document consumes only registry data; rendering it
//! to HTML or serving it is the host's concern.

use crate::generator::GeneratedEndpoint;
use crate::registry::EndpointRegistry;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Document identity block.
#[derive(Debug, Clone)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Trailhead API".to_string(),
            version: "0.1.0".to_string(),
            description: None,
        }
    }
}

/// Convert a matcher pattern to OpenAPI path syntax.
///
/// `/users/:id` → `/users/{id}`; optional markers are dropped (optionality
/// is carried by the parameter's `required` flag); `*rest` → `{rest}`.
fn openapi_path(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        if let Some(name) = segment.strip_prefix(':') {
            let name = name.strip_suffix('?').unwrap_or(name);
            out.push('{');
            out.push_str(name);
            out.push('}');
        } else if let Some(name) = segment.strip_prefix('*') {
            out.push('{');
            out.push_str(if name.is_empty() { "rest" } else { name });
            out.push('}');
        } else {
            out.push_str(segment);
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

fn operation(endpoint: &GeneratedEndpoint) -> Value {
    let mut parameters = Vec::new();
    for param in &endpoint.path_params {
        parameters.push(json!({
            "name": param.name,
            "in": "path",
            "required": param.required,
            "schema": { "type": "string" },
        }));
    }
    for param in &endpoint.query_params {
        parameters.push(json!({
            "name": param.name,
            "in": "query",
            "required": param.required,
            "schema": param.schema.clone().unwrap_or_else(|| json!({ "type": "string" })),
        }));
    }

    let mut operation = Map::new();
    operation.insert("operationId".into(), json!(endpoint.operation_id));
    operation.insert("summary".into(), json!(endpoint.summary));
    operation.insert("description".into(), json!(endpoint.description));
    operation.insert("tags".into(), json!(endpoint.tags));
    if !parameters.is_empty() {
        operation.insert("parameters".into(), Value::Array(parameters));
    }
    if let Some(schema) = &endpoint.request_schema {
        operation.insert(
            "requestBody".into(),
            json!({
                "required": true,
                "content": { "application/json": { "schema": schema } },
            }),
        );
    }
    let responses = match &endpoint.response_schema {
        Some(schema) => json!({
            "200": {
                "description": "Successful response",
                "content": { "application/json": { "schema": schema } },
            }
        }),
        None => json!({ "200": { "description": "Successful response" } }),
    };
    operation.insert("responses".into(), responses);
    if endpoint.access.requires_auth {
        operation.insert("security".into(), json!([{ "bearerAuth": [] }]));
    }
    Value::Object(operation)
}

/// Build an OpenAPI document from a set of endpoints.
#[must_use]
pub fn build_document(endpoints: &[Arc<GeneratedEndpoint>], info: &ApiInfo) -> Value {
    let mut paths: Map<String, Value> = Map::new();
    let mut any_secured = false;

    for endpoint in endpoints {
        any_secured |= endpoint.access.requires_auth;
        let path = openapi_path(&endpoint.path);
        let method = endpoint.method.as_str().to_ascii_lowercase();
        let entry = paths.entry(path).or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(operations) = entry {
            operations.insert(method, operation(endpoint));
        }
    }

    let mut info_block = Map::new();
    info_block.insert("title".into(), json!(info.title));
    info_block.insert("version".into(), json!(info.version));
    if let Some(description) = &info.description {
        info_block.insert("description".into(), json!(description));
    }

    let mut document = Map::new();
    document.insert("openapi".into(), json!("3.1.0"));
    document.insert("info".into(), Value::Object(info_block));
    document.insert("paths".into(), Value::Object(paths));
    if any_secured {
        document.insert(
            "components".into(),
            json!({
                "securitySchemes": {
                    "bearerAuth": { "type": "http", "scheme": "bearer" }
                }
            }),
        );
    }
    Value::Object(document)
}

/// Build an OpenAPI document from a registry's current endpoint set.
#[must_use]
pub fn registry_document(registry: &EndpointRegistry, info: &ApiInfo) -> Value {
    build_document(&registry.list(), info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_path_conversion() {
        assert_eq!(openapi_path("/api/users/:id"), "/api/users/{id}");
        assert_eq!(openapi_path("/posts/:year/:month?"), "/posts/{year}/{month}");
        assert_eq!(openapi_path("/files/*rest"), "/files/{rest}");
        assert_eq!(openapi_path("/"), "/");
    }
}
