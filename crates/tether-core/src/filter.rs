//! Package subset selection by name globs.

use crate::error::BootstrapError;
use crate::graph::{Package, PackageGraph};

/// Selects the package subset a run operates on.
///
/// An empty scope matches everything; ignore patterns always win.
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
    scope: Vec<glob::Pattern>,
    ignore: Vec<glob::Pattern>,
}

impl PackageFilter {
    /// Build a filter from scope and ignore globs.
    ///
    /// # Errors
    /// `CONFIG_INVALID` on an unparseable glob.
    pub fn new(scope: &[String], ignore: &[String]) -> Result<Self, BootstrapError> {
        Ok(Self {
            scope: parse_patterns(scope)?,
            ignore: parse_patterns(ignore)?,
        })
    }

    /// Whether a package name is selected.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let in_scope = self.scope.is_empty() || self.scope.iter().any(|p| p.matches(name));
        in_scope && !self.ignore.iter().any(|p| p.matches(name))
    }

    /// The selected packages, in discovery order.
    #[must_use]
    pub fn apply<'a>(&self, graph: &'a PackageGraph) -> Vec<&'a Package> {
        graph
            .packages()
            .filter(|pkg| self.matches(pkg.name()))
            .collect()
    }
}

fn parse_patterns(globs: &[String]) -> Result<Vec<glob::Pattern>, BootstrapError> {
    globs
        .iter()
        .map(|g| {
            glob::Pattern::new(g)
                .map_err(|e| BootstrapError::config_invalid(format!("Invalid glob '{g}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testing::graph_of;

    #[test]
    fn test_default_selects_everything() {
        let graph = graph_of(&[("a", "1.0.0", &[]), ("b", "1.0.0", &[])]);
        let filter = PackageFilter::default();

        assert_eq!(filter.apply(&graph).len(), 2);
    }

    #[test]
    fn test_scope_narrows() {
        let graph = graph_of(&[
            ("@org/a", "1.0.0", &[]),
            ("@org/b", "1.0.0", &[]),
            ("other", "1.0.0", &[]),
        ]);
        let filter = PackageFilter::new(&["@org/*".to_string()], &[]).unwrap();

        let names: Vec<&str> = filter.apply(&graph).iter().map(|p| p.name()).collect();
        assert_eq!(names, ["@org/a", "@org/b"]);
    }

    #[test]
    fn test_ignore_wins_over_scope() {
        let graph = graph_of(&[("@org/a", "1.0.0", &[]), ("@org/b", "1.0.0", &[])]);
        let filter =
            PackageFilter::new(&["@org/*".to_string()], &["@org/b".to_string()]).unwrap();

        let names: Vec<&str> = filter.apply(&graph).iter().map(|p| p.name()).collect();
        assert_eq!(names, ["@org/a"]);
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = PackageFilter::new(&["[".to_string()], &[]).unwrap_err();
        assert_eq!(err.code(), crate::error::codes::CONFIG_INVALID);
    }
}
