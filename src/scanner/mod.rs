//! # Route Scanner Module
//!
//! The scanner walks a routes directory tree and turns the filesystem naming
//! convention into a flat, deterministic list of [`ScannedRoute`] records.
//!
//! ## Overview
//!
//! The scanner is responsible for:
//! - Walking the tree rooted at [`ScannerConfig::root`]
//! - Applying the segment parser to every path component
//! - Classifying files (collection, resource, action, marker, ignored)
//! - Recording schema/middleware/access marker files in side indexes and
//!   merging them into same-directory routes as `has_*` flags
//! - Emitting routes sorted by nesting depth, then URL path, so specific
//!   routes always precede catch-alls downstream
//!
//! ## Two-pass algorithm
//!
//! Pass 1 collects marker-file locations keyed by directory. Pass 2 performs
//! the walk that emits routes, consulting the marker index. Marker collection
//! completes before any route is emitted; later stages rely on that ordering.
//!
//! ## Error Handling
//!
//! Unreadable directories and files are logged and skipped; a scan never
//! fails because of a single bad entry. An optional deadline bounds the
//! wall-clock time of a scan — when exceeded the scan stops and returns what
//! was collected so far.

mod cache;
mod core;

pub(crate) use core::{glob_to_regex, resource_names};

pub use cache::{ScanCache, ScanCacheStats};
pub use core::{
    scan_dir, RouteFileType, ScannedRoute, Scanner, ScannerConfig, COLLECTION_METHODS,
    RESOURCE_METHODS,
};
