//! # Path Matcher Module
//!
//! The matcher module compiles URL path patterns into regex-backed matchers
//! and resolves incoming request paths against them.
//!
//! ## Overview
//!
//! The matcher is responsible for:
//! - Compiling path patterns (`/users/:id`, `/posts/:year/:month?`, `/files/*rest`)
//!   into anchored regular expressions
//! - Testing incoming URLs and extracting URL-decoded parameters
//! - Computing a specificity score used by the registry to rank overlapping
//!   matches
//!
//! ## Architecture
//!
//! Matching is two-phase:
//!
//! 1. **Compilation**: At registration time, each pattern is converted into a
//!    regex plus a static prefix covering the segments before the first
//!    dynamic segment. Compilation happens once per (method, path) pair.
//!
//! 2. **Matching**: For each candidate, the static prefix serves as an O(1)
//!    pre-filter; only candidates passing the prefix check run their regex.
//!    On success the captured groups are decoded into named parameters.
//!
//! ## Specificity
//!
//! `score = 10 × static_segments + dynamic_segments`. More static segments
//! always beat more dynamic ones, so `/users/new` outranks `/users/:id` for
//! an input of `/users/new`. Catch-all segments contribute nothing to the
//! score, ranking them below any dynamic pattern of the same shape.

mod core;

pub use core::{compile_path, ParamVec, PathMatch, PathMatcher, MAX_INLINE_PARAMS};
