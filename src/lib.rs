//! # Trailhead
//!
//! **Trailhead** discovers REST endpoints from a filesystem naming convention,
//! computes per-endpoint access requirements, and serves runtime lookup plus
//! access-control evaluation with caching, auditing, and hot reload.
//!
//! ## Overview
//!
//! A routes directory tree is the single source of truth. Bracketed names
//! declare parameters (`[id]`, `[[page]]`, `[...rest]`), parenthesized
//! directories declare access groups (`(admin)`, `(perm:reports:export)`),
//! and underscore-prefixed files declare schema/middleware/access markers.
//! Trailhead scans the tree, generates one endpoint per (route, method)
//! pair, compiles each path into a matcher, and registers everything in a
//! central store guarded by an RBAC evaluation engine.
//!
//! ## Architecture
//!
//! The library is organized into several key modules, leaves first:
//!
//! - **[`segment`]** - pure classification of path components and group
//!   modifiers
//! - **[`scanner`]** - directory walk, file classification, marker indexing,
//!   deterministic route emission, TTL scan cache
//! - **[`generator`]** - endpoint generation: ids, display metadata, access
//!   folding and override merge, schema/middleware binding, lazy handlers
//! - **[`matcher`]** - path pattern compilation and specificity-scored
//!   matching
//! - **[`registry`]** - the central endpoint store: best-match lookup,
//!   bounded result cache, event bus, statistics
//! - **[`rbac`]** - access evaluation: permission derivation, role/
//!   permission/ownership checks, decision cache, audit trail
//! - **[`resolve`]** - injected collaborator traits and default resolvers
//! - **[`openapi`]** - OpenAPI document production from the endpoint set
//! - **[`hot_reload`]** - scan diffing and atomic reapplication
//!
//! ### Pipeline
//!
//! ```mermaid
//! sequenceDiagram
//!     participant FS as Routes Tree
//!     participant Scanner as scanner::Scanner
//!     participant Generator as generator::EndpointGenerator
//!     participant Registry as registry::EndpointRegistry
//!     participant Rbac as rbac::RbacEngine
//!     participant Host as Host Transport
//!
//!     Host->>Scanner: scan()
//!     Scanner->>Scanner: pass 1: collect markers
//!     Scanner->>Scanner: pass 2: walk + classify
//!     Scanner-->>Host: Vec<ScannedRoute>
//!     Host->>Generator: generate_all(routes)
//!     Generator->>Generator: fold group modifiers
//!     Generator->>Generator: merge _access override
//!     Generator->>Generator: bind schemas + middleware
//!     Generator-->>Host: Vec<GeneratedEndpoint>
//!     Host->>Registry: register_batch(endpoints)
//!
//!     Note over Host,Rbac: request time
//!     Host->>Registry: get_by_path("/api/users/42", GET)
//!     Registry->>Registry: prefix filter + regex + score
//!     Registry-->>Host: EndpointMatch
//!     Host->>Rbac: check_access(endpoint, user, ctx)
//!     Rbac->>Rbac: roles / permissions / ownership
//!     Rbac-->>Host: RbacCheckResult + audit record
//!     Host->>Host: invoke resolved handler
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trailhead::generator::EndpointGenerator;
//! use trailhead::registry::{EndpointRegistry, RegistryConfig};
//! use trailhead::resolve::NamedHandlerRegistry;
//! use trailhead::scanner::{Scanner, ScannerConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let routes = Scanner::new(ScannerConfig::new("./routes")).scan()?;
//! let generator = EndpointGenerator::new(Arc::new(NamedHandlerRegistry::new()));
//! let endpoints = generator.generate_all(&routes)?;
//!
//! let registry = EndpointRegistry::new(RegistryConfig::default());
//! registry.register_batch(endpoints)?;
//!
//! if let Some(found) = registry.get_by_path("/users/42", &http::Method::GET) {
//!     println!("matched {}", found.endpoint.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## The Convention
//!
//! ```text
//! routes/
//! ├── users/
//! │   ├── index.rs            # GET/POST /users
//! │   ├── search.rs           # GET /users/search
//! │   ├── [id].rs             # GET/PUT/PATCH/DELETE /users/:id
//! │   ├── _schema.json        # request/response schemas for this directory
//! │   └── _access.json        # explicit access override
//! ├── (admin)/
//! │   └── settings/
//! │       └── index.rs        # GET/POST /settings, role=admin inherited
//! ├── docs/
//! │   └── [...slug].rs        # GET /docs/*slug
//! └── _internal/              # skipped entirely
//! ```
//!
//! ## Failure Posture
//!
//! Deny by default. Unreadable scan entries are logged and skipped; marker
//! resolution failures are generation errors; unknown lookups return empty
//! results rather than errors; a checker callback that fails counts as a
//! failed check; event listeners are isolated per subscriber.

pub mod cli;
pub mod generator;
pub mod handler;
pub mod hot_reload;
pub mod matcher;
pub mod middleware;
pub mod openapi;
pub mod rbac;
pub mod registry;
pub mod resolve;
pub mod runtime_config;
pub mod scanner;
pub mod segment;

pub use generator::{ComputedAccess, EndpointGenerator, GeneratedEndpoint};
pub use matcher::{compile_path, PathMatcher};
pub use rbac::{RbacCheckResult, RbacEngine, UserContext};
pub use registry::{EndpointMatch, EndpointRegistry, RegistryConfig, RegistryEvent};
pub use scanner::{scan_dir, ScannedRoute, Scanner, ScannerConfig};
pub use segment::{parse_group_modifier, parse_segment, ParsedSegment, SegmentType};
