//! # RBAC Integration Module
//!
//! The RBAC engine evaluates an endpoint's computed access requirements
//! against a caller identity through injected checker callbacks.
//!
//! ## Overview
//!
//! [`RbacEngine::check_access`] walks a short-circuiting state flow —
//! public, authentication, anonymous deny, super-admin bypass, cached
//! decision, roles, permissions, ownership — and records every evaluation
//! in a bounded audit trail.
//!
//! ## Permission Derivation
//!
//! Endpoints without an explicit permission list get an algorithmically
//! derived set: the primary `resource:action` permission from the last
//! static path segment and the method→action table (GET→read, POST→create,
//! PUT/PATCH→update, DELETE→delete), plus a `read` permission on every
//! ancestor resource of a nested path. Custom [`DerivationRule`]s with glob
//! or regex patterns can supplement or, with the override flag, replace the
//! algorithmic result.
//!
//! ## Caching & Failure Posture
//!
//! Decisions are cached per (endpoint, user) with a TTL; the cache is
//! locked independently of the registry's maps. A checker callback that
//! errors counts as a failed check — a flaky external dependency degrades
//! to deny-by-default rather than crashing evaluation.

mod audit;
mod cache;
mod core;
mod derive;

pub use audit::{AuditRecord, AuditTrail};
pub use cache::DecisionCacheStats;
pub use core::{AccessDecision, RbacCheckResult, RbacConfig, RbacEngine, UserContext};
pub use derive::{
    derive_permissions, derive_with_rules, DerivationRule, DerivedPermission, PermissionSource,
    PermissionTemplate, RulePattern,
};
