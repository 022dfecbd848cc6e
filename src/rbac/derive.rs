//! Permission derivation.
//!
//! When an endpoint carries no explicit permission list, its requirements
//! are inferred from the URL pattern and HTTP method: the primary
//! `resource:action` permission from the last static segment and the
//! method→action table, plus a `read` permission on every ancestor resource
//! of a nested path. Custom derivation rules registered with the engine are
//! consulted first and may replace the algorithmic result outright.

use crate::scanner::{glob_to_regex, resource_names};
use http::Method;
use regex::Regex;
use serde::Serialize;

/// Where a derived permission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSource {
    /// Derived from the URL pattern
    Path,
    /// Derived from the HTTP method→action table
    Method,
    /// Contributed by a custom derivation rule
    Rule,
    /// Declared explicitly on the endpoint
    Override,
}

/// One inferred permission requirement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedPermission {
    /// Full permission string (`resource:action`)
    pub permission: String,
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
    pub source: PermissionSource,
    /// Informational confidence; never part of the allow/deny decision
    pub confidence: f64,
}

/// HTTP method → CRUD action.
fn action_for_method(method: &Method) -> &'static str {
    match method.as_str() {
        "GET" | "HEAD" => "read",
        "POST" => "create",
        "PUT" | "PATCH" => "update",
        "DELETE" => "delete",
        _ => "access",
    }
}

/// Permission template with explicit resource/action placeholders.
///
/// `{resource}` and `{action}` substitute the values derived from the
/// matched path and method; literal text passes through unchanged.
#[derive(Debug, Clone)]
pub struct PermissionTemplate {
    pub resource: String,
    pub action: String,
    pub scope: Option<String>,
}

impl PermissionTemplate {
    /// Template deriving `{resource}:{action}` verbatim.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            resource: "{resource}".to_string(),
            action: "{action}".to_string(),
            scope: None,
        }
    }

    /// Substitute placeholders against the derived resource and action.
    #[must_use]
    pub fn resolve(&self, resource: &str, action: &str) -> DerivedPermission {
        let resolved_resource = self.resource.replace("{resource}", resource);
        let resolved_action = self.action.replace("{action}", action);
        DerivedPermission {
            permission: format!("{resolved_resource}:{resolved_action}"),
            resource: resolved_resource,
            action: resolved_action,
            scope: self.scope.clone(),
            source: PermissionSource::Rule,
            confidence: 1.0,
        }
    }
}

/// Pattern form accepted by a derivation rule.
#[derive(Debug, Clone)]
pub enum RulePattern {
    /// Glob over URL patterns (`/api/admin/**`)
    Glob(String),
    /// Raw regex over URL patterns
    Regex(String),
}

/// A custom permission-derivation rule.
///
/// Rules with the `override` flag discard every algorithmically-derived
/// permission when they match; non-override rules append to it.
pub struct DerivationRule {
    pub name: String,
    pattern: Regex,
    /// Applicable methods; empty applies to all
    pub methods: Vec<Method>,
    pub template: PermissionTemplate,
    /// Higher priority rules are consulted first
    pub priority: i32,
    /// Replace algorithmic permissions instead of supplementing them
    pub override_derived: bool,
}

impl DerivationRule {
    /// Build a rule, compiling its pattern.
    ///
    /// # Errors
    ///
    /// Fails when the glob or regex pattern does not compile.
    pub fn new(
        name: impl Into<String>,
        pattern: RulePattern,
        methods: Vec<Method>,
        template: PermissionTemplate,
        priority: i32,
        override_derived: bool,
    ) -> anyhow::Result<Self> {
        let pattern = match pattern {
            RulePattern::Glob(glob) => glob_to_regex(&glob)?,
            RulePattern::Regex(source) => Regex::new(&source)?,
        };
        Ok(Self {
            name: name.into(),
            pattern,
            methods,
            template,
            priority,
            override_derived,
        })
    }

    /// Whether this rule applies to a path/method pair.
    #[must_use]
    pub fn matches(&self, path: &str, method: &Method) -> bool {
        (self.methods.is_empty() || self.methods.contains(method)) && self.pattern.is_match(path)
    }
}

/// Algorithmic permission derivation from a URL pattern and method.
///
/// Primary permission first, ancestors after: a nested path requires its own
/// resource's permission plus read access to every ancestor resource.
/// A path with no static segments derives nothing.
#[must_use]
pub fn derive_permissions(path: &str, method: &Method) -> Vec<DerivedPermission> {
    let (resource, parents) = resource_names(path);
    if resource.is_empty() {
        return Vec::new();
    }
    let action = action_for_method(method);

    let mut permissions = Vec::with_capacity(1 + parents.len());
    permissions.push(DerivedPermission {
        permission: format!("{resource}:{action}"),
        resource,
        action: action.to_string(),
        scope: None,
        source: PermissionSource::Path,
        confidence: 0.9,
    });
    for parent in parents {
        permissions.push(DerivedPermission {
            permission: format!("{parent}:read"),
            resource: parent,
            action: "read".to_string(),
            scope: None,
            source: PermissionSource::Path,
            confidence: 0.8,
        });
    }
    permissions
}

/// Derivation with custom rules layered over the algorithmic result.
///
/// Matching rules are applied highest priority first. When any matching rule
/// carries the override flag, the algorithmic permissions are discarded and
/// only override-rule permissions remain.
#[must_use]
pub fn derive_with_rules(
    path: &str,
    method: &Method,
    rules: &[DerivationRule],
) -> Vec<DerivedPermission> {
    let (resource, _) = resource_names(path);
    let action = action_for_method(method);

    let mut matched: Vec<&DerivationRule> =
        rules.iter().filter(|r| r.matches(path, method)).collect();
    matched.sort_by(|a, b| b.priority.cmp(&a.priority));

    if matched.iter().any(|r| r.override_derived) {
        return matched
            .iter()
            .filter(|r| r.override_derived)
            .map(|r| r.template.resolve(&resource, action))
            .collect();
    }

    let mut permissions = derive_permissions(path, method);
    permissions.extend(matched.iter().map(|r| r.template.resolve(&resource, action)));
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_nested_resources() {
        let permissions = derive_permissions("/api/orgs/:org_id/teams/:team_id", &Method::GET);
        let names: Vec<&str> = permissions.iter().map(|p| p.permission.as_str()).collect();
        assert_eq!(names, vec!["teams:read", "orgs:read"]);
        assert_eq!(permissions[0].source, PermissionSource::Path);
        assert!(permissions[0].confidence > permissions[1].confidence);
    }

    #[test]
    fn test_derive_collection_create() {
        let permissions = derive_permissions("/api/users", &Method::POST);
        let names: Vec<&str> = permissions.iter().map(|p| p.permission.as_str()).collect();
        assert_eq!(names, vec!["users:create"]);
    }

    #[test]
    fn test_derive_dynamic_only_path_is_empty() {
        assert!(derive_permissions("/:anything", &Method::GET).is_empty());
    }

    #[test]
    fn test_rule_supplements_derivation() {
        let rule = DerivationRule::new(
            "audit-reads",
            RulePattern::Glob("/api/reports/**".to_string()),
            vec![Method::GET],
            PermissionTemplate {
                resource: "audit".to_string(),
                action: "{action}".to_string(),
                scope: None,
            },
            10,
            false,
        )
        .expect("rule");

        let permissions = derive_with_rules("/api/reports/:id", &Method::GET, &[rule]);
        let names: Vec<&str> = permissions.iter().map(|p| p.permission.as_str()).collect();
        assert_eq!(names, vec!["reports:read", "audit:read"]);
    }

    #[test]
    fn test_override_rule_discards_derivation() {
        let rule = DerivationRule::new(
            "admin-area",
            RulePattern::Glob("/api/admin/**".to_string()),
            Vec::new(),
            PermissionTemplate {
                resource: "admin".to_string(),
                action: "manage".to_string(),
                scope: None,
            },
            0,
            true,
        )
        .expect("rule");

        let permissions = derive_with_rules("/api/admin/users/:id", &Method::DELETE, &[rule]);
        let names: Vec<&str> = permissions.iter().map(|p| p.permission.as_str()).collect();
        assert_eq!(names, vec!["admin:manage"]);
        assert_eq!(permissions[0].source, PermissionSource::Rule);
    }
}
