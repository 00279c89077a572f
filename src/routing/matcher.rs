//! Path matching logic.
//!
//! # Responsibilities
//! - Match path prefix, exact path, or path substring
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Query string is never part of the match
//! - No regex to guarantee O(n) matching

use crate::config::RoutePattern;

/// Trait for matching request paths against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Matches one path exactly.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, path: &str) -> bool {
        path == self.path
    }
}

/// Matches paths containing a fragment anywhere.
#[derive(Debug, Clone)]
pub struct PathContainsMatcher {
    fragment: String,
}

impl PathContainsMatcher {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
        }
    }
}

impl Matcher for PathContainsMatcher {
    fn matches(&self, path: &str) -> bool {
        path.contains(&self.fragment)
    }
}

/// Build the matcher for a configured pattern.
pub fn matcher_for(pattern: &RoutePattern) -> Box<dyn Matcher> {
    match pattern {
        RoutePattern::Prefix(p) => Box::new(PathPrefixMatcher::new(p.clone())),
        RoutePattern::Exact(p) => Box::new(ExactPathMatcher::new(p.clone())),
        RoutePattern::Contains(p) => Box::new(PathContainsMatcher::new(p.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_prefix_matcher() {
        let matcher = PathPrefixMatcher::new("/api/generate");
        assert!(matcher.matches("/api/generate"));
        assert!(matcher.matches("/api/generate/resume"));
        assert!(!matcher.matches("/api/extract-job"));
        assert!(!matcher.matches("/API/generate")); // Case sensitive
    }

    #[test]
    fn test_exact_matcher() {
        let matcher = ExactPathMatcher::new("/download");
        assert!(matcher.matches("/download"));
        assert!(!matcher.matches("/download/cv.pdf"));
        assert!(!matcher.matches("/downloads"));
    }

    #[test]
    fn test_contains_matcher() {
        let matcher = PathContainsMatcher::new("/auth/");
        assert!(matcher.matches("/auth/login"));
        assert!(matcher.matches("/en/auth/callback"));
        assert!(!matcher.matches("/author"));
    }
}
