use super::audit::{AuditRecord, AuditTrail};
use super::cache::{DecisionCache, DecisionCacheStats};
use super::derive::{derive_with_rules, DerivationRule};
use crate::generator::{CheckStrategy, GeneratedEndpoint};
use crate::resolve::{OwnershipChecker, PermissionChecker, RoleChecker};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};
use tracing::warn;

/// The caller identity evaluated by the engine.
///
/// Trailhead never validates credentials itself; the transport layer
/// authenticates the caller and hands over this already-established context.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    /// Stable user identifier (decision-cache key component)
    pub id: String,
    /// Roles held by the caller
    pub roles: Vec<String>,
    /// Whether the caller presented valid credentials
    pub authenticated: bool,
    /// Arbitrary claims (e.g., a `permissions` array) from the transport
    pub claims: Option<Value>,
}

impl UserContext {
    /// An authenticated caller with the given roles.
    #[must_use]
    pub fn authenticated(id: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            id: id.into(),
            roles,
            authenticated: true,
            claims: None,
        }
    }

    /// An anonymous, unauthenticated caller.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_claims(mut self, claims: Value) -> Self {
        self.claims = Some(claims);
        self
    }
}

/// Final decision category of an access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    Deny,
    RequiresAuth,
    RequiresRole,
    RequiresPermission,
}

/// Outcome of one access evaluation.
#[derive(Debug, Clone)]
pub struct RbacCheckResult {
    /// Whether the caller may proceed
    pub allowed: bool,
    /// Decision category
    pub decision: AccessDecision,
    /// Human-readable explanation
    pub reason: String,
    /// Roles the caller lacked, when the decision is `RequiresRole`
    pub missing_roles: Vec<String>,
    /// Permissions the caller lacked, when `RequiresPermission`
    pub missing_permissions: Vec<String>,
    /// Wall-clock evaluation time
    pub evaluation_time: Duration,
    /// Whether the decision was served from the per-(endpoint, user) cache
    pub cache_hit: bool,
}

impl RbacCheckResult {
    pub(crate) fn allowed(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            decision: AccessDecision::Allow,
            reason: reason.into(),
            missing_roles: Vec::new(),
            missing_permissions: Vec::new(),
            evaluation_time: Duration::ZERO,
            cache_hit: false,
        }
    }

    pub(crate) fn denied(decision: AccessDecision, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            decision,
            reason: reason.into(),
            missing_roles: Vec::new(),
            missing_permissions: Vec::new(),
            evaluation_time: Duration::ZERO,
            cache_hit: false,
        }
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct RbacConfig {
    /// Roles that bypass every check (empty disables the bypass)
    pub super_admin_roles: Vec<String>,
    /// TTL of cached decisions
    pub cache_ttl: Duration,
    /// Decision cache capacity (LRU beyond this)
    pub cache_capacity: usize,
    /// Audit ring-buffer capacity
    pub audit_capacity: usize,
    /// Outcome when an endpoint ends up with no applicable requirement at
    /// all (no roles, no derivable permissions, no ownership). Deny by
    /// default — fail closed.
    pub default_allow: bool,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            super_admin_roles: Vec::new(),
            cache_ttl: Duration::from_secs(30),
            cache_capacity: 4096,
            audit_capacity: 1024,
            default_allow: false,
        }
    }
}

/// The access evaluation engine.
///
/// Holds the injected checkers, custom derivation rules, the decision
/// cache, and the audit trail. Checker errors are treated as failed checks:
/// one flaky external dependency degrades to deny-by-default instead of
/// crashing the evaluation.
pub struct RbacEngine {
    permission_checker: Arc<dyn PermissionChecker>,
    role_checker: Arc<dyn RoleChecker>,
    ownership_checker: Option<Arc<dyn OwnershipChecker>>,
    rules: RwLock<Vec<DerivationRule>>,
    cache: DecisionCache,
    audit: AuditTrail,
    config: RbacConfig,
}

impl RbacEngine {
    /// Build an engine over the injected permission and role checkers.
    #[must_use]
    pub fn new(
        config: RbacConfig,
        permission_checker: Arc<dyn PermissionChecker>,
        role_checker: Arc<dyn RoleChecker>,
    ) -> Self {
        let cache = DecisionCache::new(config.cache_capacity, config.cache_ttl);
        let audit = AuditTrail::new(config.audit_capacity);
        Self {
            permission_checker,
            role_checker,
            ownership_checker: None,
            rules: RwLock::new(Vec::new()),
            cache,
            audit,
            config,
        }
    }

    /// Attach an ownership checker.
    #[must_use]
    pub fn with_ownership_checker(mut self, checker: Arc<dyn OwnershipChecker>) -> Self {
        self.ownership_checker = Some(checker);
        self
    }

    /// Register a custom permission-derivation rule.
    pub fn register_rule(&self, rule: DerivationRule) {
        if let Ok(mut rules) = self.rules.write() {
            rules.push(rule);
        }
    }

    /// Permissions this engine would require for a path/method pair,
    /// custom rules included.
    #[must_use]
    pub fn derive_permissions(
        &self,
        path: &str,
        method: &http::Method,
    ) -> Vec<super::derive::DerivedPermission> {
        let rules = self
            .rules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        derive_with_rules(path, method, &rules)
    }

    /// The audit trail.
    #[must_use]
    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Decision cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> DecisionCacheStats {
        self.cache.stats()
    }

    /// Drop cached decisions for one endpoint (all users). Call after the
    /// endpoint's access requirements change.
    pub fn invalidate_endpoint(&self, endpoint_id: &str) {
        self.cache.invalidate_endpoint(endpoint_id);
    }

    /// Drop every cached decision.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Evaluate an endpoint's access requirements against a caller.
    ///
    /// Short-circuits on the first applicable decision:
    ///
    /// 1. public endpoint → allow
    /// 2. auth required, caller unauthenticated → `requires_auth`
    /// 3. no caller → deny
    /// 4. super-admin role → allow (bypass)
    /// 5. fresh cached decision → returned as-is with `cache_hit`
    /// 6. role requirements via the role checker and strategy
    /// 7. permission requirements — explicit list, or derived from the
    ///    path/method with custom rules — via the permission checker
    /// 8. ownership requirement when a resource id is present in
    ///    `context.pathParams`
    /// 9. cache the decision, emit an audit record
    ///
    /// `context` is an optional JSON object; `pathParams` inside it supplies
    /// the matched path parameters for ownership checks and is forwarded to
    /// the permission checker.
    #[must_use]
    pub fn check_access(
        &self,
        endpoint: &GeneratedEndpoint,
        user: Option<&UserContext>,
        context: Option<&Value>,
    ) -> RbacCheckResult {
        let started = Instant::now();
        let access = &endpoint.access;

        // 1. Public endpoints skip everything.
        if access.is_public {
            let result = RbacCheckResult::allowed("public endpoint");
            return self.complete(endpoint, user, &[], result, false, started);
        }

        // 2. Authentication gate.
        let authenticated = user.is_some_and(|u| u.authenticated);
        if access.requires_auth && !authenticated {
            let result =
                RbacCheckResult::denied(AccessDecision::RequiresAuth, "authentication required");
            return self.complete(endpoint, user, &[], result, false, started);
        }

        // 3. Everything below needs an identity.
        let Some(user) = user else {
            let result = RbacCheckResult::denied(AccessDecision::Deny, "no caller identity");
            return self.complete(endpoint, None, &[], result, false, started);
        };

        // 4. Super-admin bypass.
        if user
            .roles
            .iter()
            .any(|role| self.config.super_admin_roles.iter().any(|s| s == role))
        {
            let result = RbacCheckResult::allowed("super-admin bypass");
            return self.complete(endpoint, Some(user), &[], result, false, started);
        }

        // 5. Cached decision for this (endpoint, user).
        if let Some(cached) = self.cache.get(&endpoint.id, &user.id) {
            let mut result = if cached.allowed {
                RbacCheckResult::allowed(cached.reason)
            } else {
                RbacCheckResult::denied(cached.decision, cached.reason)
            };
            result.cache_hit = true;
            return self.complete(endpoint, Some(user), &[], result, false, started);
        }

        // 6. Role requirements.
        let mut any_requirement = false;
        if !access.required_roles.is_empty() {
            any_requirement = true;
            let (passed, missing) = self.evaluate(
                &access.required_roles,
                access.role_strategy,
                |role| self.check_role(user, role),
            );
            if !passed {
                let mut result = RbacCheckResult::denied(
                    AccessDecision::RequiresRole,
                    "caller lacks required roles",
                );
                result.missing_roles = missing;
                return self.complete(endpoint, Some(user), &[], result, true, started);
            }
        }

        // 7. Permission requirements: explicit list wins, otherwise derive.
        let required_permissions: Vec<String> = if access.required_permissions.is_empty() {
            self.derive_permissions(&endpoint.path, &endpoint.method)
                .into_iter()
                .map(|p| p.permission)
                .collect()
        } else {
            access.required_permissions.clone()
        };
        if !required_permissions.is_empty() {
            any_requirement = true;
            let (passed, missing) = self.evaluate(
                &required_permissions,
                access.permission_strategy,
                |permission| self.check_permission(user, permission, context),
            );
            if !passed {
                let mut result = RbacCheckResult::denied(
                    AccessDecision::RequiresPermission,
                    "caller lacks required permissions",
                );
                result.missing_permissions = missing;
                return self.complete(
                    endpoint,
                    Some(user),
                    &required_permissions,
                    result,
                    true,
                    started,
                );
            }
        }

        // 8. Ownership, when a resource id is present in the path params.
        if let Some(check) = &access.ownership_check {
            let resource_id = context
                .and_then(|c| c.get("pathParams"))
                .and_then(|params| params.get(&check.id_param))
                .and_then(Value::as_str);
            if let Some(resource_id) = resource_id {
                any_requirement = true;
                if !self.check_ownership(user, &check.resource_type, resource_id, &check.owner_field)
                {
                    let result = RbacCheckResult::denied(
                        AccessDecision::Deny,
                        format!(
                            "caller does not own {} {resource_id}",
                            check.resource_type
                        ),
                    );
                    return self.complete(
                        endpoint,
                        Some(user),
                        &required_permissions,
                        result,
                        true,
                        started,
                    );
                }
            }
        }

        // 9. Final decision: allow when checks passed, otherwise the
        // configured default for fully unconstrained endpoints.
        let result = if any_requirement {
            RbacCheckResult::allowed("all access checks passed")
        } else if self.config.default_allow {
            RbacCheckResult::allowed("no applicable requirements; default allow")
        } else {
            RbacCheckResult::denied(
                AccessDecision::Deny,
                "no applicable requirements; default deny",
            )
        };
        self.complete(
            endpoint,
            Some(user),
            &required_permissions,
            result,
            true,
            started,
        )
    }

    /// Evaluate a requirement list under a strategy, collecting failures.
    fn evaluate(
        &self,
        items: &[String],
        strategy: CheckStrategy,
        check: impl Fn(&str) -> bool,
    ) -> (bool, Vec<String>) {
        let mut missing = Vec::new();
        let mut satisfied = 0usize;
        for item in items {
            if check(item) {
                satisfied += 1;
            } else {
                missing.push(item.clone());
            }
        }
        let passed = match strategy {
            CheckStrategy::Any => satisfied > 0,
            CheckStrategy::All => missing.is_empty(),
        };
        (passed, missing)
    }

    fn check_role(&self, user: &UserContext, role: &str) -> bool {
        self.role_checker.check(user, role).unwrap_or_else(|err| {
            warn!(role = %role, user_id = %user.id, error = %err, "Role checker failed; treating as not held");
            false
        })
    }

    fn check_permission(&self, user: &UserContext, permission: &str, context: Option<&Value>) -> bool {
        self.permission_checker
            .check(user, permission, context)
            .unwrap_or_else(|err| {
                warn!(permission = %permission, user_id = %user.id, error = %err, "Permission checker failed; treating as not held");
                false
            })
    }

    fn check_ownership(
        &self,
        user: &UserContext,
        resource_type: &str,
        resource_id: &str,
        owner_field: &str,
    ) -> bool {
        let Some(checker) = &self.ownership_checker else {
            warn!(
                resource_type = %resource_type,
                "Ownership check required but no ownership checker configured; denying"
            );
            return false;
        };
        checker
            .check(user, resource_type, resource_id, owner_field)
            .unwrap_or_else(|err| {
                warn!(
                    resource_type = %resource_type,
                    resource_id = %resource_id,
                    user_id = %user.id,
                    error = %err,
                    "Ownership checker failed; treating as not owned"
                );
                false
            })
    }

    /// Stamp the evaluation time, cache the decision when applicable, emit
    /// the audit record, and hand the result back.
    fn complete(
        &self,
        endpoint: &GeneratedEndpoint,
        user: Option<&UserContext>,
        required_permissions: &[String],
        mut result: RbacCheckResult,
        cacheable: bool,
        started: Instant,
    ) -> RbacCheckResult {
        result.evaluation_time = started.elapsed();

        if cacheable {
            if let Some(user) = user {
                self.cache.insert(
                    &endpoint.id,
                    &user.id,
                    result.allowed,
                    result.decision,
                    result.reason.clone(),
                );
            }
        }

        self.audit.record(
            AuditRecord {
                id: String::new(),
                timestamp: SystemTime::now(),
                endpoint_id: endpoint.id.clone(),
                method: endpoint.method.to_string(),
                path: endpoint.path.clone(),
                user_id: user.map(|u| u.id.clone()),
                user_roles: user.map(|u| u.roles.clone()).unwrap_or_default(),
                required_permissions: required_permissions.to_vec(),
                decision: result.decision,
                allowed: result.allowed,
                reason: result.reason.clone(),
                cache_hit: result.cache_hit,
                evaluation_time_ms: result.evaluation_time.as_secs_f64() * 1000.0,
            }
            .stamp(),
        );

        result
    }
}
