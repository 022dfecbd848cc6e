//! Matcher core - hot path for URL resolution.

use anyhow::Context;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., `/users/:id/posts/:post_id`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the lookup hot path.
///
/// Param names use `Arc<str>` instead of `String` because names come from the
/// compiled matcher (known at registration time) and `Arc::clone()` is an O(1)
/// atomic increment. Values remain `String` as they are per-request data
/// decoded from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path against a [`PathMatcher`].
#[derive(Debug, Clone)]
pub struct PathMatch {
    /// Extracted path parameters, URL-decoded, in pattern order
    pub params: ParamVec,
    /// Specificity score: `10 × static_segments + dynamic_segments`
    pub score: u32,
}

/// Compiled form of a path pattern.
///
/// One matcher exists per (method, path) pair and is recompiled only when the
/// owning endpoint's path changes.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    /// The original pattern (e.g., `/users/:id`)
    pub pattern: String,
    /// Anchored regex compiled from the pattern
    regex: Regex,
    /// Parameter names in capture-group order
    pub param_names: Vec<Arc<str>>,
    /// Literal prefix covering segments before the first dynamic segment.
    ///
    /// Used as an O(1) pre-filter before regex evaluation. Static segments
    /// *after* a dynamic segment are intentionally not part of the prefix;
    /// this only reduces pre-filter selectivity, never correctness, because
    /// the anchored regex always runs afterwards.
    pub static_prefix: String,
    /// Total number of pattern segments
    pub segment_count: u32,
    /// Number of static segments (weight 10 in the score)
    pub static_count: u32,
    /// Number of dynamic segments, required or optional (weight 1)
    pub dynamic_count: u32,
    /// Whether the pattern ends in a catch-all segment
    pub has_catch_all: bool,
}

impl PathMatcher {
    /// Test a request path against this matcher.
    ///
    /// Rejects on static-prefix mismatch before running the regex. On success
    /// every captured group is URL-decoded into its named parameter; optional
    /// segments absent from the input simply produce no parameter entry.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        if !self.static_prefix.is_empty() && !path.starts_with(self.static_prefix.as_str()) {
            return None;
        }

        let captures = self.regex.captures(path)?;

        let mut params = ParamVec::new();
        for (idx, name) in self.param_names.iter().enumerate() {
            if let Some(value) = captures.get(idx + 1) {
                let decoded = urlencoding::decode(value.as_str())
                    .map(|cow| cow.into_owned())
                    .unwrap_or_else(|_| value.as_str().to_string());
                params.push((Arc::clone(name), decoded));
            }
        }

        Some(PathMatch {
            params,
            score: self.score(),
        })
    }

    /// Specificity score for ranking overlapping matches.
    #[inline]
    #[must_use]
    pub fn score(&self) -> u32 {
        10 * self.static_count + self.dynamic_count
    }
}

/// Compile a path pattern into a [`PathMatcher`].
///
/// Pattern grammar, per `/`-separated segment:
///
/// - `:name` — required dynamic segment, captures one non-slash token
/// - `:name?` — optional dynamic segment, optional non-capturing wrapper
///   around the capture
/// - `*name` (or bare `*`) — catch-all, optional wrapper around a capture
///   matching the remainder of the path including slashes; must be last
/// - anything else — literal segment
///
/// # Errors
///
/// Returns an error if a catch-all segment is followed by further segments
/// or if the assembled regex fails to compile (malformed literal content).
pub fn compile_path(pattern: &str) -> anyhow::Result<PathMatcher> {
    if pattern == "/" || pattern.is_empty() {
        let regex = Regex::new(r"^/$").context("failed to compile root path regex")?;
        return Ok(PathMatcher {
            pattern: "/".to_string(),
            regex,
            param_names: Vec::new(),
            static_prefix: "/".to_string(),
            segment_count: 0,
            static_count: 0,
            dynamic_count: 0,
            has_catch_all: false,
        });
    }

    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    let mut param_names: Vec<Arc<str>> = Vec::new();
    let mut static_prefix = String::new();
    let mut in_prefix = true;
    let mut segment_count = 0u32;
    let mut static_count = 0u32;
    let mut dynamic_count = 0u32;
    let mut has_catch_all = false;

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        anyhow::ensure!(
            !has_catch_all,
            "catch-all segment must be last in pattern {pattern:?}"
        );
        segment_count += 1;

        if let Some(rest) = segment.strip_prefix('*') {
            let name = if rest.is_empty() { "rest" } else { rest };
            source.push_str("(?:/(.+))?");
            param_names.push(Arc::from(name));
            has_catch_all = true;
            in_prefix = false;
        } else if let Some(rest) = segment.strip_prefix(':') {
            in_prefix = false;
            if let Some(name) = rest.strip_suffix('?') {
                source.push_str("(?:/([^/]+))?");
                param_names.push(Arc::from(name));
            } else {
                source.push_str("/([^/]+)");
                param_names.push(Arc::from(rest));
            }
            dynamic_count += 1;
        } else {
            source.push('/');
            source.push_str(&regex::escape(segment));
            if in_prefix {
                static_prefix.push('/');
                static_prefix.push_str(segment);
            }
            static_count += 1;
        }
    }

    source.push('$');
    let regex = Regex::new(&source)
        .with_context(|| format!("failed to compile regex for pattern {pattern:?}"))?;

    Ok(PathMatcher {
        pattern: pattern.to_string(),
        regex,
        param_names,
        static_prefix,
        segment_count,
        static_count,
        dynamic_count,
        has_catch_all,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(pattern: &str) -> PathMatcher {
        compile_path(pattern).expect("pattern should compile")
    }

    #[test]
    fn test_static_pattern_exact_match_only() {
        let m = matcher("/api/health");
        assert!(m.match_path("/api/health").is_some());
        assert!(m.match_path("/api/health/live").is_none());
        assert!(m.match_path("/api").is_none());
        let hit = m.match_path("/api/health").expect("match");
        assert!(hit.params.is_empty());
        assert_eq!(hit.score, 20);
    }

    #[test]
    fn test_dynamic_pattern_extracts_param() {
        let m = matcher("/api/users/:id");
        let hit = m.match_path("/api/users/123").expect("match");
        assert_eq!(hit.params[0].0.as_ref(), "id");
        assert_eq!(hit.params[0].1, "123");
        assert_eq!(hit.score, 21);
    }

    #[test]
    fn test_optional_params_bind_progressively() {
        let m = matcher("/api/posts/:year/:month?/:day?");
        let hit = m.match_path("/api/posts/2024").expect("match");
        assert_eq!(hit.params.len(), 1);

        let hit = m.match_path("/api/posts/2024/06/15").expect("match");
        assert_eq!(hit.params.len(), 3);
        assert_eq!(hit.params[2].1, "15");
    }

    #[test]
    fn test_catch_all_spans_slashes() {
        let m = matcher("/files/*path");
        let hit = m.match_path("/files/a/b/c.txt").expect("match");
        assert_eq!(hit.params[0].0.as_ref(), "path");
        assert_eq!(hit.params[0].1, "a/b/c.txt");
        // Catch-all compiles to an optional wrapper: bare prefix matches too.
        assert!(m.match_path("/files").is_some());
    }

    #[test]
    fn test_catch_all_must_be_last() {
        assert!(compile_path("/files/*rest/extra").is_err());
    }

    #[test]
    fn test_static_prefix_stops_at_first_dynamic() {
        let m = matcher("/api/users/:id/settings");
        assert_eq!(m.static_prefix, "/api/users");
        assert_eq!(m.static_count, 3);
        assert_eq!(m.dynamic_count, 1);
    }

    #[test]
    fn test_params_are_url_decoded() {
        let m = matcher("/tags/:name");
        let hit = m.match_path("/tags/hello%20world").expect("match");
        assert_eq!(hit.params[0].1, "hello world");
    }
}
