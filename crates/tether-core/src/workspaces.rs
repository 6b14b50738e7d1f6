//! Workspace discovery for multi-package repositories.
//!
//! Parses the `workspaces` field from the root package.json and expands its
//! glob patterns into member packages.

use crate::error::BootstrapError;
use crate::graph::Package;
use crate::manifest::{read_manifest, Manifest};
use std::path::{Path, PathBuf};

/// The repository root: its location and parsed manifest.
#[derive(Debug, Clone)]
pub struct RootProject {
    pub location: PathBuf,
    pub manifest: Manifest,
}

impl RootProject {
    /// The root resolved-module directory.
    #[must_use]
    pub fn modules_dir(&self) -> PathBuf {
        self.location.join("node_modules")
    }

    /// The root binary directory.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.modules_dir().join(".bin")
    }
}

/// Discover the root project and its workspace packages.
///
/// # Errors
/// `MANIFEST_NOT_FOUND` / `MANIFEST_INVALID` for the root manifest itself,
/// `WORKSPACE_NOT_FOUND` when it declares no usable workspaces.
pub fn discover(root: &Path) -> Result<(RootProject, Vec<Package>), BootstrapError> {
    let manifest = read_manifest(&root.join("package.json"))?;

    let patterns: Vec<String> = manifest
        .workspaces
        .as_ref()
        .map(|ws| ws.patterns().to_vec())
        .unwrap_or_default();

    if patterns.is_empty() {
        return Err(BootstrapError::workspace_not_found(root));
    }

    let packages = expand_patterns(root, &patterns);

    Ok((
        RootProject {
            location: root.to_path_buf(),
            manifest,
        },
        packages,
    ))
}

/// Expand workspace glob patterns into packages, in pattern order then
/// glob order. Directories without a readable named manifest are skipped.
fn expand_patterns(root: &Path, patterns: &[String]) -> Vec<Package> {
    let mut packages = Vec::new();

    for pattern in patterns {
        let full_pattern = root.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let Ok(entries) = glob::glob(&pattern_str) else {
            tracing::warn!(pattern = %pattern, "invalid workspace glob, skipping");
            continue;
        };

        for entry in entries.flatten() {
            if let Some(pkg) = read_member(&entry) {
                packages.push(pkg);
            }
        }
    }

    packages
}

/// Read package info from a workspace member directory.
fn read_member(dir: &Path) -> Option<Package> {
    if !dir.is_dir() {
        return None;
    }

    let manifest = match read_manifest(&dir.join("package.json")) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "skipping workspace member");
            return None;
        }
    };

    Package::from_manifest(dir.to_path_buf(), manifest)
}

/// Find the workspace root by walking up the directory tree.
///
/// Returns the first directory containing a package.json with a
/// `workspaces` field.
#[must_use]
pub fn find_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let manifest_path = current.join("package.json");
        if manifest_path.exists() {
            if let Ok(manifest) = read_manifest(&manifest_path) {
                if manifest.workspaces.is_some() {
                    return Some(current);
                }
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
