use crate::segment::{parse_segment, GroupModifier, ParsedSegment, SegmentType};
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Methods generated for a collection route (`index` files, default files).
pub const COLLECTION_METHODS: [Method; 2] = [Method::GET, Method::POST];

/// Methods generated for a resource route (single-dynamic-segment files).
pub const RESOURCE_METHODS: [Method; 4] = [Method::GET, Method::PUT, Method::PATCH, Method::DELETE];

/// Basenames recognized as collection index files.
const INDEX_BASENAMES: [&str; 2] = ["index", "mod"];

/// Action vocabulary: file basename → HTTP method set.
static ACTION_METHODS: Lazy<HashMap<&'static str, &'static [Method]>> = Lazy::new(|| {
    HashMap::from([
        ("create", &[Method::POST] as &[Method]),
        ("update", &[Method::PUT, Method::PATCH]),
        ("edit", &[Method::PUT, Method::PATCH]),
        ("delete", &[Method::DELETE]),
        ("remove", &[Method::DELETE]),
        ("list", &[Method::GET]),
        ("search", &[Method::GET]),
        ("count", &[Method::GET]),
        ("export", &[Method::GET]),
    ])
});

/// Classification of one scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFileType {
    /// Index or default file — the collection endpoint for its directory
    Collection,
    /// Single-dynamic-segment file (`[id]`) — one addressable resource
    Resource,
    /// File whose basename is in the action vocabulary (`search`, `create`, …)
    Action,
    /// `_schema` marker file, recorded in a side index
    Schema,
    /// `_middleware` marker file, recorded in a side index
    Middleware,
    /// `_access` marker file, recorded in a side index
    AccessOverride,
    /// Private or non-matching file, skipped
    Ignored,
}

/// One route discovered by a scan pass.
///
/// Immutable once created; a rescan supersedes records rather than mutating
/// them.
#[derive(Debug, Clone)]
pub struct ScannedRoute {
    /// Absolute path of the file that produced this route
    pub file_path: PathBuf,
    /// Generated URL pattern (e.g., `/api/users/:id`)
    pub url_path: String,
    /// Parsed segments of the full path, group segments included
    pub segments: Vec<ParsedSegment>,
    /// HTTP methods this route responds to
    pub http_methods: Vec<Method>,
    /// File classification that produced the method set
    pub file_type: RouteFileType,
    /// Parameter names in URL order
    pub param_names: Vec<String>,
    /// Last static URL segment — the resource this route addresses
    pub resource_name: String,
    /// Static ancestor segments that own a dynamic child, outermost first
    pub parent_resources: Vec<String>,
    /// Access modifiers inherited from enclosing group directories, in order
    pub group_modifiers: Vec<GroupModifier>,
    /// Whether a `_schema` marker exists in the same directory
    pub has_schema: bool,
    /// Whether a `_middleware` marker exists in the same directory
    pub has_middleware: bool,
    /// Whether an `_access` marker exists in the same directory
    pub has_access_override: bool,
    /// Location of the same-directory `_schema` marker
    pub schema_file: Option<PathBuf>,
    /// Location of the same-directory `_middleware` marker
    pub middleware_file: Option<PathBuf>,
    /// Location of the same-directory `_access` marker
    pub access_file: Option<PathBuf>,
    /// Number of URL segments (nesting depth)
    pub depth: usize,
}

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Root directory of the routes tree
    pub root: PathBuf,
    /// File extensions considered route files
    pub extensions: Vec<String>,
    /// Glob patterns excluded from the scan (matched against relative paths)
    pub ignore_globs: Vec<String>,
    /// URL prefix prepended to every generated path (e.g., `/api`)
    pub base_path: String,
    /// Wall-clock budget for one scan pass
    pub deadline: Option<Duration>,
    /// Follow symbolic links during the walk
    pub follow_links: bool,
}

impl ScannerConfig {
    /// Configuration with conventional defaults for the given root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: ["rs", "json", "yaml", "yml", "ts", "js"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_globs: Vec::new(),
            base_path: String::new(),
            deadline: None,
            follow_links: false,
        }
    }

    /// Stable fingerprint of every field that affects scan output.
    ///
    /// Used as part of the scan-cache key so two configs with the same root
    /// but different extensions or globs never share a cache entry.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.root.to_string_lossy().as_bytes());
        for ext in &self.extensions {
            hasher.update(b"\0ext:");
            hasher.update(ext.as_bytes());
        }
        for glob in &self.ignore_globs {
            hasher.update(b"\0glob:");
            hasher.update(glob.as_bytes());
        }
        hasher.update(b"\0base:");
        hasher.update(self.base_path.as_bytes());
        hasher.update(if self.follow_links { b"\0l1" } else { b"\0l0" });
        let digest = format!("{:x}", hasher.finalize());
        digest.chars().take(16).collect()
    }
}

/// Marker-file locations collected by pass 1, keyed by containing directory.
#[derive(Debug, Default)]
struct MarkerIndex {
    schemas: HashMap<PathBuf, PathBuf>,
    middleware: HashMap<PathBuf, PathBuf>,
    access: HashMap<PathBuf, PathBuf>,
}

/// Walks a routes tree and emits [`ScannedRoute`] records.
pub struct Scanner {
    config: ScannerConfig,
    ignore_patterns: Vec<Regex>,
}

impl Scanner {
    /// Create a scanner for the given configuration.
    ///
    /// Ignore globs that fail to compile are logged and dropped rather than
    /// failing the whole scanner.
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        let ignore_patterns = config
            .ignore_globs
            .iter()
            .filter_map(|glob| match glob_to_regex(glob) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!(glob = %glob, error = %err, "Dropping unparseable ignore glob");
                    None
                }
            })
            .collect();
        Self {
            config,
            ignore_patterns,
        }
    }

    /// Scanner configuration.
    #[must_use]
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scan the routes tree.
    ///
    /// Two passes: marker files first, then route emission. Output is sorted
    /// ascending by nesting depth, then lexicographically by URL path, so
    /// more specific routes register before catch-alls.
    ///
    /// # Errors
    ///
    /// Returns an error only when the root directory itself is unreadable;
    /// individual unreadable entries are logged and skipped.
    pub fn scan(&self) -> anyhow::Result<Vec<ScannedRoute>> {
        anyhow::ensure!(
            self.config.root.is_dir(),
            "routes root {} is not a directory",
            self.config.root.display()
        );

        let started = Instant::now();

        // Pass 1: marker collection must complete before route emission.
        let markers = self.collect_markers();

        // Pass 2: route emission.
        let mut routes = Vec::new();
        let walker = WalkDir::new(&self.config.root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // Private directories are skipped entirely; pass 1 already
                // harvested any marker files they host.
                !(entry.file_type().is_dir() && is_private_dir(entry.path(), &self.config.root))
            });

        for entry in walker {
            if let Some(deadline) = self.config.deadline {
                if started.elapsed() > deadline {
                    warn!(
                        root = %self.config.root.display(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        routes_collected = routes.len(),
                        "Scan deadline exceeded, returning partial result"
                    );
                    break;
                }
            }

            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable entry during scan");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if self.is_ignored(entry.path()) {
                debug!(path = %entry.path().display(), "Ignoring file matching ignore glob");
                continue;
            }
            if let Some(route) = self.build_route(entry.path(), &markers) {
                routes.push(route);
            }
        }

        routes.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.url_path.cmp(&b.url_path)));

        info!(
            root = %self.config.root.display(),
            routes_count = routes.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Route scan complete"
        );
        Ok(routes)
    }

    /// Pass 1: find every `_schema` / `_middleware` / `_access` marker.
    ///
    /// Private directories are not skipped here — a private directory may
    /// still host marker files.
    fn collect_markers(&self) -> MarkerIndex {
        let mut index = MarkerIndex::default();
        for entry in WalkDir::new(&self.config.root)
            .follow_links(self.config.follow_links)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable entry during marker collection");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(stem) = file_stem(entry.path()) else {
                continue;
            };
            let Some(dir) = entry.path().parent() else {
                continue;
            };
            let slot = match stem {
                "_schema" => &mut index.schemas,
                "_middleware" => &mut index.middleware,
                "_access" => &mut index.access,
                _ => continue,
            };
            slot.entry(dir.to_path_buf())
                .or_insert_with(|| entry.path().to_path_buf());
        }
        debug!(
            schemas = index.schemas.len(),
            middleware = index.middleware.len(),
            access = index.access.len(),
            "Marker collection complete"
        );
        index
    }

    /// Build one route record for a file, or `None` when the file does not
    /// produce a route (markers, private files, foreign extensions).
    fn build_route(&self, path: &Path, markers: &MarkerIndex) -> Option<ScannedRoute> {
        let extension = path.extension()?.to_str()?;
        if !self.config.extensions.iter().any(|e| e == extension) {
            return None;
        }
        let stem = file_stem(path)?;
        let (file_type, methods) = classify_file(stem);
        match file_type {
            RouteFileType::Schema
            | RouteFileType::Middleware
            | RouteFileType::AccessOverride
            | RouteFileType::Ignored => return None,
            _ => {}
        }

        let relative = path.strip_prefix(&self.config.root).ok()?;
        let mut segments: Vec<ParsedSegment> = Vec::new();
        for component in relative.parent().into_iter().flat_map(Path::components) {
            let raw = component.as_os_str().to_str()?;
            segments.push(parse_segment(raw));
        }
        // Index files collapse into their directory; everything else
        // contributes its own basename as a trailing segment.
        if !INDEX_BASENAMES.contains(&stem) {
            segments.push(parse_segment(stem));
        }

        let mut url_path = self.config.base_path.clone();
        let mut param_names = Vec::new();
        let mut group_modifiers = Vec::new();
        for segment in &segments {
            match segment.segment_type {
                SegmentType::Static => {
                    url_path.push('/');
                    url_path.push_str(&segment.name);
                }
                SegmentType::Dynamic => {
                    let param = segment.param_name.clone()?;
                    url_path.push_str("/:");
                    url_path.push_str(&param);
                    param_names.push(param);
                }
                SegmentType::Optional => {
                    let param = segment.param_name.clone()?;
                    url_path.push_str("/:");
                    url_path.push_str(&param);
                    url_path.push('?');
                    param_names.push(param);
                }
                SegmentType::CatchAll => {
                    let param = segment.param_name.clone()?;
                    url_path.push_str("/*");
                    url_path.push_str(&param);
                    param_names.push(param);
                }
                SegmentType::Group => {
                    if let Some(modifier) = &segment.group_modifier {
                        group_modifiers.push(modifier.clone());
                    }
                }
                SegmentType::Private => return None,
            }
        }
        if url_path.is_empty() {
            url_path.push('/');
        }

        let (resource_name, parent_resources) = resource_names(&url_path);
        let depth = url_path.split('/').filter(|s| !s.is_empty()).count();
        let dir = path.parent()?.to_path_buf();
        let schema_file = markers.schemas.get(&dir).cloned();
        let middleware_file = markers.middleware.get(&dir).cloned();
        let access_file = markers.access.get(&dir).cloned();

        Some(ScannedRoute {
            file_path: path.to_path_buf(),
            url_path,
            http_methods: methods,
            file_type,
            param_names,
            resource_name,
            parent_resources,
            group_modifiers,
            has_schema: schema_file.is_some(),
            has_middleware: middleware_file.is_some(),
            has_access_override: access_file.is_some(),
            schema_file,
            middleware_file,
            access_file,
            depth,
            segments,
        })
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.config.root) else {
            return false;
        };
        let relative = relative.to_string_lossy();
        self.ignore_patterns.iter().any(|re| re.is_match(&relative))
    }
}

/// Scan a routes tree with default configuration.
///
/// # Errors
///
/// See [`Scanner::scan`].
pub fn scan_dir(root: impl Into<PathBuf>) -> anyhow::Result<Vec<ScannedRoute>> {
    Scanner::new(ScannerConfig::new(root)).scan()
}

/// Classify a file basename into its route type and method set.
fn classify_file(stem: &str) -> (RouteFileType, Vec<Method>) {
    match stem {
        "_schema" => return (RouteFileType::Schema, Vec::new()),
        "_middleware" => return (RouteFileType::Middleware, Vec::new()),
        "_access" => return (RouteFileType::AccessOverride, Vec::new()),
        s if s.starts_with('_') => return (RouteFileType::Ignored, Vec::new()),
        _ => {}
    }
    if INDEX_BASENAMES.contains(&stem) {
        return (RouteFileType::Collection, COLLECTION_METHODS.to_vec());
    }
    let parsed = parse_segment(stem);
    match parsed.segment_type {
        SegmentType::Dynamic => (RouteFileType::Resource, RESOURCE_METHODS.to_vec()),
        SegmentType::Optional | SegmentType::CatchAll => {
            (RouteFileType::Resource, vec![Method::GET])
        }
        _ => {
            if let Some(methods) = ACTION_METHODS.get(stem) {
                (RouteFileType::Action, methods.to_vec())
            } else {
                (RouteFileType::Collection, COLLECTION_METHODS.to_vec())
            }
        }
    }
}

/// Derive the resource name and its ancestors from a URL pattern.
///
/// The resource is the last static segment. Ancestors are earlier static
/// segments immediately followed by a dynamic segment — the shape nested
/// REST resources take (`/orgs/:org_id/teams/:team_id`).
pub(crate) fn resource_names(url_path: &str) -> (String, Vec<String>) {
    let segments: Vec<&str> = url_path.split('/').filter(|s| !s.is_empty()).collect();
    let is_static = |s: &str| !s.starts_with(':') && !s.starts_with('*');

    let resource = segments
        .iter()
        .rev()
        .find(|s| is_static(s))
        .map(|s| (*s).to_string())
        .unwrap_or_default();

    let mut parents = Vec::new();
    for window in segments.windows(2) {
        if is_static(window[0]) && !is_static(window[1]) && window[0] != resource {
            parents.push(window[0].to_string());
        }
    }
    (resource, parents)
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn is_private_dir(path: &Path, root: &Path) -> bool {
    if path == root {
        return false;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Compile a glob pattern into an anchored regex.
///
/// Supports `**` (any depth), `*` (one component), and `?` (one character).
pub(crate) fn glob_to_regex(glob: &str) -> anyhow::Result<Regex> {
    let mut source = String::with_capacity(glob.len() * 2 + 2);
    source.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // Swallow a following separator so `**/x` also matches `x`.
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        source.push_str("(?:.*/)?");
                    } else {
                        source.push_str(".*");
                    }
                } else {
                    source.push_str("[^/]*");
                }
            }
            '?' => source.push_str("[^/]"),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_index_as_collection() {
        let (kind, methods) = classify_file("index");
        assert_eq!(kind, RouteFileType::Collection);
        assert_eq!(methods, COLLECTION_METHODS.to_vec());
    }

    #[test]
    fn test_classify_dynamic_as_resource() {
        let (kind, methods) = classify_file("[id]");
        assert_eq!(kind, RouteFileType::Resource);
        assert_eq!(methods, RESOURCE_METHODS.to_vec());
    }

    #[test]
    fn test_classify_action_vocabulary() {
        let (kind, methods) = classify_file("search");
        assert_eq!(kind, RouteFileType::Action);
        assert_eq!(methods, vec![Method::GET]);

        let (kind, methods) = classify_file("create");
        assert_eq!(kind, RouteFileType::Action);
        assert_eq!(methods, vec![Method::POST]);
    }

    #[test]
    fn test_classify_markers() {
        assert_eq!(classify_file("_schema").0, RouteFileType::Schema);
        assert_eq!(classify_file("_middleware").0, RouteFileType::Middleware);
        assert_eq!(classify_file("_access").0, RouteFileType::AccessOverride);
        assert_eq!(classify_file("_helpers").0, RouteFileType::Ignored);
    }

    #[test]
    fn test_unknown_basename_defaults_to_collection() {
        let (kind, _) = classify_file("stats");
        assert_eq!(kind, RouteFileType::Collection);
    }

    #[test]
    fn test_resource_names_nested() {
        let (resource, parents) = resource_names("/api/orgs/:org_id/teams/:team_id");
        assert_eq!(resource, "teams");
        assert_eq!(parents, vec!["orgs".to_string()]);
    }

    #[test]
    fn test_resource_names_flat() {
        let (resource, parents) = resource_names("/api/users");
        assert_eq!(resource, "users");
        assert!(parents.is_empty());
    }

    #[test]
    fn test_glob_to_regex() {
        let re = glob_to_regex("**/drafts/**").expect("glob");
        assert!(re.is_match("a/b/drafts/c.rs"));
        assert!(re.is_match("drafts/c.rs"));
        assert!(!re.is_match("a/b/final/c.rs"));

        let re = glob_to_regex("*.tmp").expect("glob");
        assert!(re.is_match("x.tmp"));
        assert!(!re.is_match("a/x.tmp"));
    }
}
