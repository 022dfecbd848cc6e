//! Access computation: folding group modifiers and merging explicit overrides.
//!
//! A route's access requirements come from two sources. Parenthesized group
//! directories contribute modifiers in path order, folded into a
//! [`ComputedAccess`]. A same-directory `_access` marker contributes a
//! partial [`AccessOverride`] merged field-by-field over the folded result —
//! override fields always win, untouched fields keep their folded value.

use crate::segment::{GroupModifier, GroupModifierType};
use serde::{Deserialize, Serialize};

/// Combination strategy for multi-role / multi-permission requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStrategy {
    /// At least one requirement must hold
    #[default]
    Any,
    /// Every requirement must hold
    All,
}

/// Declarative ownership requirement attached to an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipCheck {
    /// Resource type passed to the ownership checker
    pub resource_type: String,
    /// Path parameter holding the resource id
    #[serde(default = "default_id_param")]
    pub id_param: String,
    /// Field on the stored resource naming its owner
    #[serde(default = "default_owner_field")]
    pub owner_field: String,
}

fn default_id_param() -> String {
    "id".to_string()
}

fn default_owner_field() -> String {
    "owner_id".to_string()
}

/// Fully-resolved access requirements for one endpoint.
///
/// Invariant: `is_public == true` implies `requires_auth == false`; the fold
/// and the merge both re-establish it as their final step.
///
/// Defaults fail closed where it matters: multiple roles combine with `any`
/// (holding one granted role suffices), but multiple permissions combine
/// with `all` — a nested path's derived set (own permission plus ancestor
/// reads) must be held in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedAccess {
    /// Endpoint is reachable without any caller identity
    pub is_public: bool,
    /// Endpoint requires an authenticated caller
    pub requires_auth: bool,
    /// Roles required of the caller
    pub required_roles: Vec<String>,
    /// Permissions required of the caller; empty means derive from the path
    pub required_permissions: Vec<String>,
    /// How multiple required roles combine
    pub role_strategy: CheckStrategy,
    /// How multiple required permissions combine
    pub permission_strategy: CheckStrategy,
    /// Access scope (e.g., `team`, `org`)
    pub scope: Option<String>,
    /// Ownership requirement, checked when the id parameter is present
    pub ownership_check: Option<OwnershipCheck>,
    /// Group names that contributed to this access record, in path order
    pub inherited_from: Vec<String>,
    /// Field names replaced by an explicit override marker
    pub overrides: Vec<String>,
}

impl Default for ComputedAccess {
    fn default() -> Self {
        Self {
            is_public: false,
            requires_auth: false,
            required_roles: Vec::new(),
            required_permissions: Vec::new(),
            role_strategy: CheckStrategy::Any,
            permission_strategy: CheckStrategy::All,
            scope: None,
            ownership_check: None,
            inherited_from: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

/// Partial access record parsed from an `_access` marker file.
///
/// Every field is optional; only present fields participate in the merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccessOverride {
    pub is_public: Option<bool>,
    pub requires_auth: Option<bool>,
    pub required_roles: Option<Vec<String>>,
    pub required_permissions: Option<Vec<String>>,
    pub role_strategy: Option<CheckStrategy>,
    pub permission_strategy: Option<CheckStrategy>,
    pub scope: Option<String>,
    pub ownership_check: Option<OwnershipCheck>,
}

/// Fold a route's ordered group modifiers into a [`ComputedAccess`].
///
/// Later modifiers win on conflicting scalar fields; list fields accumulate.
/// The `owner` group attaches an ownership check against `resource_name`.
#[must_use]
pub fn fold_group_modifiers(modifiers: &[GroupModifier], resource_name: &str) -> ComputedAccess {
    let mut access = ComputedAccess::default();
    for modifier in modifiers {
        access.inherited_from.push(modifier.name.clone());
        match modifier.modifier_type {
            GroupModifierType::Public => {
                access.is_public = true;
                access.requires_auth = false;
            }
            GroupModifierType::Auth => {
                access.requires_auth = true;
            }
            GroupModifierType::Role => {
                if let Some(role) = &modifier.value {
                    access.required_roles.push(role.clone());
                }
                access.requires_auth = true;
            }
            GroupModifierType::Permission => {
                if let Some(permission) = &modifier.value {
                    access.required_permissions.push(permission.clone());
                }
                access.requires_auth = true;
            }
            GroupModifierType::Scope => {
                access.scope = modifier.value.clone();
                access.requires_auth = true;
            }
            GroupModifierType::Custom => {
                if modifier.value.as_deref() == Some("owner") {
                    access.ownership_check = Some(OwnershipCheck {
                        resource_type: resource_name.to_string(),
                        id_param: default_id_param(),
                        owner_field: default_owner_field(),
                    });
                    access.requires_auth = true;
                }
            }
        }
    }
    if access.is_public {
        access.requires_auth = false;
    }
    access
}

/// Merge an explicit override over a folded access record, field by field.
///
/// Only fields the override actually sets are replaced; every replaced field
/// name is recorded in `overrides`. The public/auth invariant is
/// re-established last, so an override setting `is_public = true` wins over
/// an inherited auth requirement.
#[must_use]
pub fn merge_override(base: &ComputedAccess, over: &AccessOverride) -> ComputedAccess {
    let mut merged = base.clone();
    merged.overrides.clear();

    if let Some(is_public) = over.is_public {
        merged.is_public = is_public;
        merged.overrides.push("isPublic".to_string());
    }
    if let Some(requires_auth) = over.requires_auth {
        merged.requires_auth = requires_auth;
        merged.overrides.push("requiresAuth".to_string());
    }
    if let Some(roles) = &over.required_roles {
        merged.required_roles = roles.clone();
        merged.overrides.push("requiredRoles".to_string());
    }
    if let Some(permissions) = &over.required_permissions {
        merged.required_permissions = permissions.clone();
        merged.overrides.push("requiredPermissions".to_string());
    }
    if let Some(strategy) = over.role_strategy {
        merged.role_strategy = strategy;
        merged.overrides.push("roleStrategy".to_string());
    }
    if let Some(strategy) = over.permission_strategy {
        merged.permission_strategy = strategy;
        merged.overrides.push("permissionStrategy".to_string());
    }
    if let Some(scope) = &over.scope {
        merged.scope = Some(scope.clone());
        merged.overrides.push("scope".to_string());
    }
    if let Some(check) = &over.ownership_check {
        merged.ownership_check = Some(check.clone());
        merged.overrides.push("ownershipCheck".to_string());
    }

    if merged.is_public {
        merged.requires_auth = false;
    }
    merged
}
