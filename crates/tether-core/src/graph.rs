//! Package graph: workspace packages and their dependency edges.
//!
//! Built once at startup from manifest discovery, read-only thereafter.
//! Every declared dependency of a member resolves to either a *local* edge
//! (the name belongs to another graph member) or an *external* edge (name
//! plus requested range); an external edge never aliases a member.

use crate::manifest::Manifest;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Immutable snapshot of an on-disk package manifest.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    version: String,
    location: PathBuf,
    manifest: Manifest,
}

impl Package {
    /// Create a package from its location and parsed manifest.
    ///
    /// Returns `None` if the manifest has no name.
    #[must_use]
    pub fn from_manifest(location: PathBuf, manifest: Manifest) -> Option<Self> {
        let name = manifest.name.clone()?;
        let version = manifest
            .version
            .clone()
            .unwrap_or_else(|| "0.0.0".to_string());
        Some(Self {
            name,
            version,
            location,
            manifest,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Absolute filesystem location of the package.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The package's resolved-module directory.
    #[must_use]
    pub fn modules_dir(&self) -> PathBuf {
        self.location.join("node_modules")
    }

    /// The package's binary directory.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.modules_dir().join(".bin")
    }
}

struct Node {
    package: Package,
    local: Vec<String>,
    external: Vec<(String, String)>,
}

/// All packages plus their resolved local and external dependency edges.
pub struct PackageGraph {
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
}

impl PackageGraph {
    /// Build the graph from discovered packages, splitting each package's
    /// declared dependencies into local and external edges.
    ///
    /// On duplicate names the first discovered package wins.
    #[must_use]
    pub fn new(packages: Vec<Package>) -> Self {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut nodes: Vec<Node> = Vec::new();

        for package in packages {
            if by_name.contains_key(package.name()) {
                tracing::warn!(name = %package.name(), "duplicate package name, keeping first");
                continue;
            }
            by_name.insert(package.name().to_string(), nodes.len());
            nodes.push(Node {
                package,
                local: Vec::new(),
                external: Vec::new(),
            });
        }

        for node in &mut nodes {
            let deps = node.package.manifest().merged_dependencies();
            let mut local = Vec::new();
            let mut external = Vec::new();

            for (name, range) in deps {
                if name == node.package.name() {
                    continue;
                }
                if by_name.contains_key(&name) {
                    local.push(name);
                } else {
                    external.push((name, range));
                }
            }

            node.local = local;
            node.external = external;
        }

        Self { nodes, by_name }
    }

    /// Look up a package by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.by_name.get(name).map(|&idx| &self.nodes[idx].package)
    }

    /// Whether a package with this name is a graph member.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All packages in discovery order.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.nodes.iter().map(|n| &n.package)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names of the local dependencies of `name` (empty for non-members).
    #[must_use]
    pub fn local_dependencies(&self, name: &str) -> &[String] {
        self.by_name
            .get(name)
            .map_or(&[], |&idx| self.nodes[idx].local.as_slice())
    }

    /// External (name, requested range) edges of `name` (empty for non-members).
    #[must_use]
    pub fn external_dependencies(&self, name: &str) -> &[(String, String)] {
        self.by_name
            .get(name)
            .map_or(&[], |&idx| self.nodes[idx].external.as_slice())
    }
}
