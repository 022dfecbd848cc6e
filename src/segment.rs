//! # Segment Parser Module
//!
//! Pure classification of route path components. The filesystem convention uses
//! bracket syntax for parameters and parenthesis syntax for access groups:
//!
//! - `users` — static segment, contributes literally to the URL
//! - `[id]` — required dynamic segment, becomes `:id`
//! - `[[page]]` — optional dynamic segment, becomes `:page?`
//! - `[...rest]` — required catch-all, becomes `*rest`
//! - `[[...rest]]` — optional catch-all
//! - `(admin)` — group segment carrying an access modifier, never part of the URL
//! - `_private` — private marker, the subtree is skipped entirely
//!
//! Classification is total: no input panics, and unrecognized bracket forms
//! degrade to a static segment carrying the literal name.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Kind of a parsed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentType {
    /// Literal segment, contributes its name to the URL path
    Static,
    /// Required parameter (`[id]` → `:id`)
    Dynamic,
    /// Optional parameter (`[[page]]` → `:page?`)
    Optional,
    /// Catch-all parameter matching the rest of the path (`[...rest]` → `*rest`)
    CatchAll,
    /// Parenthesized access group (`(admin)`), never part of the URL
    Group,
    /// Underscore-prefixed private marker, subtree is not routed
    Private,
}

/// Kind of access modifier derived from a group segment name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupModifierType {
    /// Endpoint is public, no authentication required
    Public,
    /// Endpoint requires an authenticated caller
    Auth,
    /// Endpoint requires a role (value carries the role name)
    Role,
    /// Endpoint requires a permission (value carries the permission string)
    Permission,
    /// Endpoint is scoped (value carries the scope name)
    Scope,
    /// Unrecognized group name, carried through verbatim
    Custom,
}

/// Access modifier attached to a [`SegmentType::Group`] segment.
///
/// Group modifiers contribute to the computed access requirements of every
/// route beneath them without affecting the URL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupModifier {
    /// Raw group name as written in the directory name (inside the parens)
    pub name: String,
    /// Classified modifier kind
    pub modifier_type: GroupModifierType,
    /// Extracted value (role name, permission string, scope, or raw custom name)
    pub value: Option<String>,
}

/// One classified path component.
///
/// Produced once per raw segment string by [`parse_segment`]; immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedSegment {
    /// Classified segment kind
    pub segment_type: SegmentType,
    /// Literal name for static segments, empty for private markers
    pub name: String,
    /// Parameter name for dynamic/optional/catch-all segments
    pub param_name: Option<String>,
    /// Whether the segment may be absent from a matching URL
    pub is_optional: bool,
    /// Access modifier for group segments
    pub group_modifier: Option<GroupModifier>,
}

impl ParsedSegment {
    fn stat(name: &str) -> Self {
        Self {
            segment_type: SegmentType::Static,
            name: name.to_string(),
            param_name: None,
            is_optional: false,
            group_modifier: None,
        }
    }
}

/// Well-known group names and their modifier classification.
///
/// Names not in this table and not carrying a `perm:`/`role:`/`scope:` prefix
/// fall through to [`GroupModifierType::Custom`].
static KNOWN_GROUPS: Lazy<HashMap<&'static str, (GroupModifierType, Option<&'static str>)>> =
    Lazy::new(|| {
        HashMap::from([
            ("public", (GroupModifierType::Public, None)),
            ("auth", (GroupModifierType::Auth, None)),
            ("authenticated", (GroupModifierType::Auth, None)),
            ("protected", (GroupModifierType::Auth, None)),
            ("admin", (GroupModifierType::Role, Some("admin"))),
            ("internal", (GroupModifierType::Role, Some("internal"))),
            ("owner", (GroupModifierType::Custom, Some("owner"))),
            ("team", (GroupModifierType::Scope, Some("team"))),
            ("org", (GroupModifierType::Scope, Some("org"))),
        ])
    });

/// Classify a group name into an access modifier.
///
/// Recognition order: explicit `perm:` / `role:` / `scope:` prefixes with
/// value extraction, then the well-known name table, finally a custom
/// modifier carrying the raw name as its value.
#[must_use]
pub fn parse_group_modifier(name: &str) -> GroupModifier {
    if let Some(value) = name.strip_prefix("perm:") {
        return GroupModifier {
            name: name.to_string(),
            modifier_type: GroupModifierType::Permission,
            value: Some(value.to_string()),
        };
    }
    if let Some(value) = name.strip_prefix("role:") {
        return GroupModifier {
            name: name.to_string(),
            modifier_type: GroupModifierType::Role,
            value: Some(value.to_string()),
        };
    }
    if let Some(value) = name.strip_prefix("scope:") {
        return GroupModifier {
            name: name.to_string(),
            modifier_type: GroupModifierType::Scope,
            value: Some(value.to_string()),
        };
    }
    if let Some((modifier_type, value)) = KNOWN_GROUPS.get(name) {
        return GroupModifier {
            name: name.to_string(),
            modifier_type: *modifier_type,
            value: value.map(str::to_string),
        };
    }
    GroupModifier {
        name: name.to_string(),
        modifier_type: GroupModifierType::Custom,
        value: Some(name.to_string()),
    }
}

/// Classify one raw path component into a [`ParsedSegment`].
///
/// Rules are checked in priority order:
///
/// 1. `_`-prefixed → [`SegmentType::Private`] with an empty name
/// 2. fully parenthesized → [`SegmentType::Group`] with a parsed modifier
/// 3. `[...name]` / `[[...name]]` → [`SegmentType::CatchAll`], optional when
///    double-bracketed
/// 4. `[[name]]` → [`SegmentType::Optional`]
/// 5. `[name]` → [`SegmentType::Dynamic`]
/// 6. anything else → [`SegmentType::Static`] with the literal name
///
/// Total function: malformed bracket forms (unbalanced, empty parameter
/// names) degrade to a static segment rather than erroring.
#[must_use]
pub fn parse_segment(raw: &str) -> ParsedSegment {
    if raw.starts_with('_') {
        return ParsedSegment {
            segment_type: SegmentType::Private,
            name: String::new(),
            param_name: None,
            is_optional: false,
            group_modifier: None,
        };
    }

    if let Some(inner) = raw
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .filter(|s| !s.is_empty() && !s.contains('(') && !s.contains(')'))
    {
        return ParsedSegment {
            segment_type: SegmentType::Group,
            name: inner.to_string(),
            param_name: None,
            is_optional: false,
            group_modifier: Some(parse_group_modifier(inner)),
        };
    }

    // Double-bracketed catch-all: [[...rest]]
    if let Some(param) = raw
        .strip_prefix("[[...")
        .and_then(|s| s.strip_suffix("]]"))
        .filter(|s| is_valid_param(s))
    {
        return ParsedSegment {
            segment_type: SegmentType::CatchAll,
            name: raw.to_string(),
            param_name: Some(param.to_string()),
            is_optional: true,
            group_modifier: None,
        };
    }

    // Single-bracketed catch-all: [...rest]
    if let Some(param) = raw
        .strip_prefix("[...")
        .and_then(|s| s.strip_suffix(']'))
        .filter(|s| is_valid_param(s))
    {
        return ParsedSegment {
            segment_type: SegmentType::CatchAll,
            name: raw.to_string(),
            param_name: Some(param.to_string()),
            is_optional: false,
            group_modifier: None,
        };
    }

    // Optional parameter: [[name]]
    if let Some(param) = raw
        .strip_prefix("[[")
        .and_then(|s| s.strip_suffix("]]"))
        .filter(|s| is_valid_param(s))
    {
        return ParsedSegment {
            segment_type: SegmentType::Optional,
            name: raw.to_string(),
            param_name: Some(param.to_string()),
            is_optional: true,
            group_modifier: None,
        };
    }

    // Required parameter: [name]
    if let Some(param) = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .filter(|s| is_valid_param(s))
    {
        return ParsedSegment {
            segment_type: SegmentType::Dynamic,
            name: raw.to_string(),
            param_name: Some(param.to_string()),
            is_optional: false,
            group_modifier: None,
        };
    }

    ParsedSegment::stat(raw)
}

/// Parameter names must be non-empty and bracket-free.
fn is_valid_param(name: &str) -> bool {
    !name.is_empty() && !name.contains('[') && !name.contains(']') && !name.contains('.')
}
