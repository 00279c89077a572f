//! Protected route set.

use crate::config::RoutePattern;
use crate::routing::matcher::{matcher_for, Matcher};

/// The set of paths the gate applies to. Everything else passes untouched.
#[derive(Debug)]
pub struct ProtectedRoutes {
    matchers: Vec<Box<dyn Matcher>>,
}

impl ProtectedRoutes {
    pub fn from_config(patterns: &[RoutePattern]) -> Self {
        let matchers = patterns.iter().map(matcher_for).collect();
        Self { matchers }
    }

    /// True if any configured pattern matches `path`.
    pub fn is_protected(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtectedRoutesConfig;

    #[test]
    fn test_default_routes() {
        let routes = ProtectedRoutes::from_config(&ProtectedRoutesConfig::default().patterns);
        assert_eq!(routes.len(), 5);

        for path in ["/api/generate", "/api/download/docx", "/generate", "/download", "/auth/signin"] {
            assert!(routes.is_protected(path), "{path} should be protected");
        }
        for path in ["/", "/cv", "/about", "/api/extract-job", "/generate/x", "/favicon.ico"] {
            assert!(!routes.is_protected(path), "{path} should pass through");
        }
    }

    #[test]
    fn test_empty_set_protects_nothing() {
        let routes = ProtectedRoutes::from_config(&[]);
        assert!(routes.is_empty());
        assert!(!routes.is_protected("/api/generate"));
    }
}
