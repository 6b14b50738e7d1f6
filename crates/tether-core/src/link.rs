//! Symlink creation for local packages and executables.
//!
//! After installs complete, every local dependency edge (A depends on B) gets
//! a link from B's location into A's resolved-module directory, plus links
//! for B's executables into A's binary directory. All operations are
//! idempotent: links already pointing at the right target are left alone.

use crate::error::{warnings, BootstrapError, Warning};
use crate::graph::{Package, PackageGraph};
use crate::manifest::Manifest;
use futures::stream::{self, StreamExt};
use std::fs;
use std::path::{Path, PathBuf};

/// Link every local dependency edge of the filtered packages.
///
/// Edges are independent and run fully parallel up to `concurrency`. Link
/// failures do not abort other edges; they are returned as non-fatal
/// warnings.
pub async fn link_local_dependencies(
    graph: &PackageGraph,
    filtered: &[&Package],
    concurrency: usize,
) -> Vec<Warning> {
    let mut edges: Vec<(&Package, &Package)> = Vec::new();
    for pkg in filtered {
        for dep_name in graph.local_dependencies(pkg.name()) {
            if let Some(dep) = graph.get(dep_name) {
                edges.push((pkg, dep));
            }
        }
    }

    tracing::debug!(edges = edges.len(), "linking local dependencies");

    let collected: Vec<Vec<Warning>> = stream::iter(edges)
        .map(|(pkg, dep)| async move { link_edge(pkg, dep) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    collected.into_iter().flatten().collect()
}

/// Link one dependency edge: module directory plus executables.
fn link_edge(pkg: &Package, dep: &Package) -> Vec<Warning> {
    let mut warns = Vec::new();

    match module_link_path(&pkg.modules_dir(), dep.name()) {
        Ok(link_path) => {
            if let Err(e) = link_dir(dep.location(), &link_path) {
                warns.push(Warning::new(warnings::ELINK, e.to_string()));
                return warns;
            }
        }
        Err(e) => {
            warns.push(Warning::new(warnings::ELINK, e.to_string()));
            return warns;
        }
    }

    warns.extend(link_package_binaries(
        dep.location(),
        dep.manifest(),
        &pkg.bin_dir(),
    ));
    warns
}

/// Link a package's declared executables into a binary directory.
///
/// Returns non-fatal warnings for entries that cannot be linked.
pub(crate) fn link_package_binaries(
    pkg_dir: &Path,
    manifest: &Manifest,
    dest_bin: &Path,
) -> Vec<Warning> {
    let mut warns = Vec::new();
    for (bin_name, rel_path) in manifest.bin_entries() {
        let src = pkg_dir.join(&rel_path);
        if let Err(e) = link_executable(&src, dest_bin, &bin_name) {
            warns.push(Warning::new(warnings::ELINK, e.to_string()));
        }
    }
    warns
}

/// Compute the link path for a package inside a module directory, creating
/// the scope directory for scoped names.
pub(crate) fn module_link_path(
    modules_dir: &Path,
    pkg_name: &str,
) -> Result<PathBuf, BootstrapError> {
    fs::create_dir_all(modules_dir).map_err(|e| {
        BootstrapError::link_failed(format!(
            "Failed to create {}: {e}",
            modules_dir.display()
        ))
    })?;

    if let Some(rest) = pkg_name.strip_prefix('@') {
        let Some((scope, name)) = rest.split_once('/') else {
            return Err(BootstrapError::link_failed(format!(
                "Invalid scoped package name: {pkg_name}"
            )));
        };
        let scope_dir = modules_dir.join(format!("@{scope}"));
        fs::create_dir_all(&scope_dir).map_err(|e| {
            BootstrapError::link_failed(format!(
                "Failed to create scope directory @{scope}: {e}"
            ))
        })?;
        Ok(scope_dir.join(name))
    } else {
        Ok(modules_dir.join(pkg_name))
    }
}

/// Create a directory link, replacing whatever is in the way.
///
/// A link already pointing at `src` is left untouched.
pub(crate) fn link_dir(src: &Path, dst: &Path) -> Result<(), BootstrapError> {
    if tether_util::fs::is_symlink_to(dst, src) {
        return Ok(());
    }

    tether_util::fs::remove_dir_all_if_exists(dst).map_err(|e| {
        BootstrapError::link_failed(format!(
            "Failed to remove existing {}: {e}",
            dst.display()
        ))
    })?;

    create_dir_link(src, dst).map_err(|e| {
        BootstrapError::link_failed(format!(
            "Failed to link {} -> {}: {e}",
            dst.display(),
            src.display()
        ))
    })
}

#[cfg(unix)]
fn create_dir_link(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn create_dir_link(src: &Path, dst: &Path) -> std::io::Result<()> {
    junction::create(src, dst)
}

/// Link an executable into a binary directory and mark the source runnable.
pub(crate) fn link_executable(
    src: &Path,
    dest_bin: &Path,
    bin_name: &str,
) -> Result<(), BootstrapError> {
    fs::create_dir_all(dest_bin).map_err(|e| {
        BootstrapError::link_failed(format!("Failed to create {}: {e}", dest_bin.display()))
    })?;

    let dst = dest_bin.join(bin_name);
    if tether_util::fs::is_symlink_to(&dst, src) {
        make_executable(src);
        return Ok(());
    }

    tether_util::fs::remove_dir_all_if_exists(&dst).map_err(|e| {
        BootstrapError::link_failed(format!(
            "Failed to remove existing {}: {e}",
            dst.display()
        ))
    })?;

    create_file_link(src, &dst).map_err(|e| {
        BootstrapError::link_failed(format!(
            "Failed to link executable {} -> {}: {e}",
            dst.display(),
            src.display()
        ))
    })?;

    make_executable(src);
    Ok(())
}

#[cfg(unix)]
fn create_file_link(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn create_file_link(src: &Path, dst: &Path) -> std::io::Result<()> {
    // File symlinks need elevation on Windows; fall back to a copy shim.
    std::os::windows::fs::symlink_file(src, dst).or_else(|_| fs::copy(src, dst).map(|_| ()))
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(perms.mode() | 0o111);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
