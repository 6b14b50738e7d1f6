//! Batched install orchestration.
//!
//! Turns an [`InstallPlan`](crate::hoist::InstallPlan) into install calls
//! against the external client: one call for the entire root set, one call
//! per leaf package with unsatisfied dependencies. Independent targets run
//! with bounded parallelism; the root install is scheduled first and gates
//! binary linking and shadow-copy pruning, but not unrelated leaf installs.

use crate::client::Installer;
use crate::error::{BootstrapError, Warning};
use crate::graph::PackageGraph;
use crate::hoist::{InstallPlan, LeafInstall};
use crate::link;
use crate::manifest::Manifest;
use crate::progress::Progress;
use crate::workspaces::RootProject;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;

/// Execute an install plan.
///
/// Returns non-fatal warnings from binary linking. Any install call failing
/// aborts the remaining not-yet-started actions (fail-fast) and propagates
/// `INSTALL_FAILED`; completed actions are not rolled back.
pub async fn apply<I: Installer + Sync>(
    plan: &InstallPlan,
    graph: &PackageGraph,
    root: &RootProject,
    installer: &I,
    concurrency: usize,
) -> Result<Vec<Warning>, BootstrapError> {
    let concurrency = concurrency.max(1);

    let leaf_targets: Vec<(&str, PathBuf, Vec<String>)> = plan
        .leaves
        .iter()
        .filter(|(_, installs)| installs.iter().any(|i| !i.satisfied))
        .filter_map(|(name, installs)| {
            let pkg = graph.get(name)?;
            // All-or-nothing per target: every leaf dependency of the
            // package goes into the one call.
            let specs = installs.iter().map(LeafInstall::spec).collect();
            Some((pkg.name(), pkg.location().to_path_buf(), specs))
        })
        .collect();

    let progress = Progress::new("install", leaf_targets.len());

    let mut units: Vec<BoxFuture<'_, Result<Vec<Warning>, BootstrapError>>> = Vec::new();

    // Root first: expected to be the longest-running unit of work.
    if !plan.root.is_empty() {
        units.push(root_unit(plan, graph, root, installer, concurrency).boxed());
    }

    for (name, location, specs) in &leaf_targets {
        let progress = progress.clone();
        units.push(
            async move {
                installer.install(location, specs).await?;
                progress.tick(name);
                Ok(Vec::new())
            }
            .boxed(),
        );
    }

    let mut pending = stream::iter(units).buffer_unordered(concurrency);
    let mut warns = Vec::new();
    while let Some(result) = pending.next().await {
        warns.extend(result?);
    }

    Ok(warns)
}

/// Install the root set, then link hoisted binaries and prune stale copies.
async fn root_unit<I: Installer + Sync>(
    plan: &InstallPlan,
    graph: &PackageGraph,
    root: &RootProject,
    installer: &I,
    concurrency: usize,
) -> Result<Vec<Warning>, BootstrapError> {
    if plan.root.iter().any(|entry| !entry.satisfied) {
        // Never a subset: one call for the whole root set keeps the
        // client's resolution consistent across runs.
        installer.install(&root.location, &plan.root_specs()).await?;
    }

    let warns = link_root_binaries(plan, graph, root);
    prune_shadow_copies(plan, graph, concurrency).await;
    Ok(warns)
}

/// Link executables of root-hoisted dependencies into every dependent
/// package's binary directory. Runs even when no install call was needed.
fn link_root_binaries(plan: &InstallPlan, graph: &PackageGraph, root: &RootProject) -> Vec<Warning> {
    let root_modules = root.modules_dir();
    let mut warns = Vec::new();

    for entry in &plan.root {
        let pkg_dir = root_modules.join(&entry.name);
        let installed = Manifest::read_lenient(&pkg_dir);
        if installed.bin_entries().is_empty() {
            continue;
        }

        for dependent in &entry.dependents {
            let Some(pkg) = graph.get(dependent) else {
                continue;
            };
            warns.extend(link::link_package_binaries(
                &pkg_dir,
                &installed,
                &pkg.bin_dir(),
            ));
        }
    }

    warns
}

/// Remove stale copies of hoisted dependencies from their dependents' own
/// module directories. Best-effort, bounded parallel; failures are logged
/// and do not abort anything.
async fn prune_shadow_copies(plan: &InstallPlan, graph: &PackageGraph, concurrency: usize) {
    let mut targets: Vec<PathBuf> = Vec::new();
    for entry in &plan.root {
        for dependent in &entry.dependents {
            if let Some(pkg) = graph.get(dependent) {
                targets.push(pkg.modules_dir().join(&entry.name));
            }
        }
    }

    stream::iter(targets)
        .map(|path| async move {
            match tether_util::fs::remove_dir_all_if_exists(&path) {
                Ok(true) => tracing::debug!(path = %path.display(), "pruned stale hoisted copy"),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to prune stale copy");
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<()>>()
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::MockInstaller;
    use crate::graph::Package;
    use crate::hoist::RootInstall;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn disk_package(root: &Path, name: &str) -> Package {
        let location = root.join("packages").join(name);
        fs::create_dir_all(&location).unwrap();
        let manifest = Manifest {
            name: Some(name.to_string()),
            version: Some("1.0.0".to_string()),
            ..Manifest::default()
        };
        Package::from_manifest(location, manifest).unwrap()
    }

    fn root_project(dir: &Path) -> RootProject {
        RootProject {
            location: dir.to_path_buf(),
            manifest: Manifest::default(),
        }
    }

    fn write_installed(modules_dir: &Path, name: &str, version: &str, bin: Option<&str>) {
        let dir = modules_dir.join(name);
        fs::create_dir_all(&dir).unwrap();
        let bin_field = bin.map_or(String::new(), |b| format!(r#", "bin": "{b}""#));
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name": "{name}", "version": "{version}"{bin_field}}}"#),
        )
        .unwrap();
        if let Some(b) = bin {
            fs::write(dir.join(b), "#!/usr/bin/env node\n").unwrap();
        }
    }

    fn root_entry(name: &str, range: &str, dependents: &[&str], satisfied: bool) -> RootInstall {
        RootInstall {
            name: name.to_string(),
            range: range.to_string(),
            dependents: dependents.iter().map(|s| (*s).to_string()).collect(),
            satisfied,
        }
    }

    fn leaf_entry(name: &str, range: &str, satisfied: bool) -> LeafInstall {
        LeafInstall {
            name: name.to_string(),
            range: range.to_string(),
            satisfied,
        }
    }

    #[tokio::test]
    async fn test_fully_satisfied_plan_issues_no_calls_but_links_binaries() {
        let dir = tempdir().unwrap();
        let root = root_project(dir.path());
        let p1 = disk_package(dir.path(), "p1");
        let graph = PackageGraph::new(vec![p1]);

        write_installed(&root.modules_dir(), "tool", "1.2.0", Some("cli.js"));

        let mut plan = InstallPlan::default();
        plan.root.push(root_entry("tool", "^1.0.0", &["p1"], true));

        let installer = MockInstaller::default();
        let warns = apply(&plan, &graph, &root, &installer, 4).await.unwrap();

        assert_eq!(installer.call_count(), 0);
        assert!(warns.is_empty());
        // Binary still linked into the dependent
        assert!(graph.get("p1").unwrap().bin_dir().join("tool").exists());
    }

    #[tokio::test]
    async fn test_root_set_installed_in_one_call() {
        let dir = tempdir().unwrap();
        let root = root_project(dir.path());
        let graph = PackageGraph::new(vec![]);

        let mut plan = InstallPlan::default();
        plan.root.push(root_entry("a", "^1.0.0", &[], true));
        plan.root.push(root_entry("b", "^2.0.0", &[], false));

        let installer = MockInstaller::default();
        apply(&plan, &graph, &root, &installer, 4).await.unwrap();

        // One unsatisfied entry pulls the whole set into a single call.
        let calls = installer.calls_for(&root.location);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ["a@^1.0.0", "b@^2.0.0"]);
    }

    #[tokio::test]
    async fn test_leaf_calls_scoped_per_package() {
        let dir = tempdir().unwrap();
        let root = root_project(dir.path());
        let p1 = disk_package(dir.path(), "p1");
        let p2 = disk_package(dir.path(), "p2");
        let graph = PackageGraph::new(vec![p1, p2]);

        let mut plan = InstallPlan::default();
        plan.leaves.insert(
            "p1".to_string(),
            vec![
                leaf_entry("x", "^1.0.0", true),
                leaf_entry("y", "^1.0.0", false),
            ],
        );
        // p2 fully satisfied: skipped entirely
        plan.leaves
            .insert("p2".to_string(), vec![leaf_entry("z", "^1.0.0", true)]);

        let installer = MockInstaller::default();
        apply(&plan, &graph, &root, &installer, 4).await.unwrap();

        assert_eq!(installer.call_count(), 1);
        let calls = installer.calls_for(graph.get("p1").unwrap().location());
        assert_eq!(calls.len(), 1);
        // All of p1's leaf dependencies, satisfied ones included
        assert_eq!(calls[0], ["x@^1.0.0", "y@^1.0.0"]);
    }

    #[tokio::test]
    async fn test_install_failure_propagates() {
        let dir = tempdir().unwrap();
        let root = root_project(dir.path());
        let graph = PackageGraph::new(vec![]);

        let mut plan = InstallPlan::default();
        plan.root.push(root_entry("a", "^1.0.0", &[], false));

        let installer = MockInstaller::failing_for(root.location.clone());
        let err = apply(&plan, &graph, &root, &installer, 4)
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::error::codes::INSTALL_FAILED);
    }

    #[tokio::test]
    async fn test_prune_removes_stale_shadow_copies() {
        let dir = tempdir().unwrap();
        let root = root_project(dir.path());
        let p1 = disk_package(dir.path(), "p1");
        let graph = PackageGraph::new(vec![p1]);

        // Stale shadow copy inside the dependent
        let shadow = graph.get("p1").unwrap().modules_dir().join("tool");
        fs::create_dir_all(&shadow).unwrap();
        fs::write(shadow.join("package.json"), "{}").unwrap();

        write_installed(&root.modules_dir(), "tool", "1.2.0", None);

        let mut plan = InstallPlan::default();
        plan.root.push(root_entry("tool", "^1.0.0", &["p1"], true));

        let installer = MockInstaller::default();
        apply(&plan, &graph, &root, &installer, 4).await.unwrap();

        assert!(!shadow.exists());
    }

    #[tokio::test]
    async fn test_empty_plan_is_noop() {
        let dir = tempdir().unwrap();
        let root = root_project(dir.path());
        let graph = PackageGraph::new(vec![]);

        let installer = MockInstaller::default();
        let warns = apply(&InstallPlan::default(), &graph, &root, &installer, 4)
            .await
            .unwrap();

        assert_eq!(installer.call_count(), 0);
        assert!(warns.is_empty());
    }
}
