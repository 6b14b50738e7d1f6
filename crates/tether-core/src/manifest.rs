//! package.json reading and the manifest data model.
//!
//! Workspace manifests are read strictly (invalid JSON is an error). Installed
//! copies under `node_modules` are read leniently: any failure yields an empty
//! manifest so callers never branch on absence.

use crate::error::BootstrapError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// The subset of package.json that tether consumes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: IndexMap<String, String>,
    pub dev_dependencies: IndexMap<String, String>,
    pub optional_dependencies: IndexMap<String, String>,
    pub peer_dependencies: IndexMap<String, String>,
    pub scripts: BTreeMap<String, String>,
    pub bin: Option<BinField>,
    pub workspaces: Option<WorkspacesField>,
}

/// The `bin` field: a single path or a name -> path map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BinField {
    Path(String),
    Map(IndexMap<String, String>),
}

/// The `workspaces` field: an array of globs or `{ "packages": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    Patterns(Vec<String>),
    Config { packages: Vec<String> },
}

impl WorkspacesField {
    /// The configured glob patterns, regardless of field shape.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::Patterns(p) | Self::Config { packages: p } => p,
        }
    }
}

impl Manifest {
    /// All installable dependencies merged into one ordered map.
    ///
    /// Precedence on duplicate names: `dependencies` > `devDependencies` >
    /// `optionalDependencies`. `peerDependencies` are never installed and are
    /// excluded. Iteration order is document order of first appearance.
    #[must_use]
    pub fn merged_dependencies(&self) -> IndexMap<String, String> {
        let mut merged: IndexMap<String, String> = IndexMap::new();
        for (name, range) in &self.optional_dependencies {
            merged.insert(name.clone(), range.clone());
        }
        for (name, range) in &self.dev_dependencies {
            merged.insert(name.clone(), range.clone());
        }
        for (name, range) in &self.dependencies {
            merged.insert(name.clone(), range.clone());
        }
        merged
    }

    /// The script text for a lifecycle stage, if declared.
    #[must_use]
    pub fn script(&self, stage: &str) -> Option<&str> {
        self.scripts.get(stage).map(String::as_str)
    }

    /// Executable entries as (binary name, relative path) pairs.
    ///
    /// A bare-string `bin` maps to the unscoped package name.
    #[must_use]
    pub fn bin_entries(&self) -> Vec<(String, String)> {
        match &self.bin {
            None => Vec::new(),
            Some(BinField::Path(path)) => {
                let bin_name = self
                    .name
                    .as_deref()
                    .map(unscoped_name)
                    .unwrap_or_default()
                    .to_string();
                if bin_name.is_empty() {
                    Vec::new()
                } else {
                    vec![(bin_name, path.clone())]
                }
            }
            Some(BinField::Map(map)) => map
                .iter()
                .map(|(name, path)| (name.clone(), path.clone()))
                .collect(),
        }
    }

    /// Read the manifest inside `dir`, failing closed to an empty manifest.
    ///
    /// Used for installed-copy metadata lookups where absence is a valid
    /// outcome, not an error path.
    #[must_use]
    pub fn read_lenient(dir: &Path) -> Self {
        let path = dir.join("package.json");
        tether_util::fs::read_to_string_lossy(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }
}

/// The package name without its scope prefix.
fn unscoped_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Read and parse a package.json file.
///
/// # Errors
/// `MANIFEST_NOT_FOUND` if the file is absent, `MANIFEST_INVALID` if it
/// cannot be parsed.
pub fn read_manifest(path: &Path) -> Result<Manifest, BootstrapError> {
    if !path.exists() {
        return Err(BootstrapError::manifest_not_found(path));
    }

    let content = tether_util::fs::read_to_string_lossy(path)
        .map_err(|e| BootstrapError::manifest_invalid(format!("Failed to read: {e}")))?;

    serde_json::from_str(&content).map_err(|e| {
        BootstrapError::manifest_invalid(format!("{}: {e}", path.display()))
    })
}
