//! # CLI Module
//!
//! Command-line interface for inspecting a routes tree.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Scan a routes tree and print the generated endpoint table:
//!
//! ```bash
//! trailhead-gen routes --root ./routes --base-path /api
//! ```
//!
//! ### `openapi`
//!
//! Emit the OpenAPI document generated from a routes tree:
//!
//! ```bash
//! trailhead-gen openapi --root ./routes --out openapi.json
//! ```
//!
//! ### `check`
//!
//! Resolve one path and method and print the winning endpoint, its
//! extracted parameters, and its access requirements:
//!
//! ```bash
//! trailhead-gen check --root ./routes --path /api/users/42 --method GET
//! ```
//!
//! Marker files (`_schema`, `_access`, `_middleware`) are resolved with the
//! filesystem resolvers; middleware names bind to no-op placeholders since
//! the CLI only introspects.

mod commands;

pub use commands::{run_cli, Cli, Commands};
