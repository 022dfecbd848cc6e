//! # Endpoint Generator Module
//!
//! The generator turns [`ScannedRoute`](crate::scanner::ScannedRoute)
//! records into fully-specified [`GeneratedEndpoint`] values, one per
//! supported HTTP method.
//!
//! ## Overview
//!
//! For each (route, method) pair the generator:
//! - Derives the deterministic endpoint id (`lower(method) + "_" +
//!   sanitized(path)`) and display metadata from a fixed per-method template
//!   table
//! - Computes access requirements by folding the route's group modifiers and
//!   deep-merging an explicit `_access` override when one exists — override
//!   fields win per field, not per record
//! - Binds path parameter descriptors from the parsed segments and query
//!   parameter descriptors from the `_schema` marker, scoped to the method
//! - Resolves the middleware chain with ascending declaration-order priority
//! - Stores a lazily-resolved handler slot; a missing handler surfaces only
//!   when the endpoint is invoked
//!
//! ## Error Posture
//!
//! Schema, middleware, and access resolution are eager: their failures are
//! generation errors because they change the endpoint's shape. Handler
//! resolution is lazy by design. Generation performs no other I/O and is
//! independent per route, so callers may parallelize across routes.

mod access;
mod core;

pub use access::{
    fold_group_modifiers, merge_override, AccessOverride, CheckStrategy, ComputedAccess,
    OwnershipCheck,
};
pub use core::{endpoint_id, EndpointGenerator, GeneratedEndpoint, PathParamMeta};
