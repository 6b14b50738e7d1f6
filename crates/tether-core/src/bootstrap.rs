//! The top-level bootstrap waterfall.
//!
//! preinstall -> dependency planning -> installs -> local symlinking ->
//! install/postinstall/prepublish/prepare, strictly sequential. A failure at
//! any stage cancels all not-yet-started stages and propagates; non-fatal
//! warnings are collected and reported after the run. Partially completed
//! filesystem mutations are never rolled back — re-running is the recovery
//! path.

use crate::batch::topological_batches;
use crate::client::{ClientConfig, Installer, NpmClient};
use crate::error::{BootstrapError, Warning};
use crate::filter::PackageFilter;
use crate::graph::{Package, PackageGraph};
use crate::hoist::{self, HoistConfig};
use crate::install;
use crate::lifecycle::{run_stage, InvocationContext, LifecycleStage};
use crate::link;
use crate::workspaces;
use std::path::Path;

/// Options for one bootstrap run.
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Which external dependencies are hoisted to the repository root.
    pub hoist: HoistConfig,
    /// Bound on parallel installs, scripts, pruning and linking.
    pub concurrency: usize,
    /// External client selection and invocation options.
    pub client: ClientConfig,
    /// Package subset selection.
    pub filter: PackageFilter,
    /// Skip every lifecycle stage (installs and links still run).
    pub ignore_scripts: bool,
    /// Fail on local dependency cycles instead of collapsing them.
    pub reject_cycles: bool,
    /// Whether this run is nested inside one of its own lifecycle scripts.
    pub context: InvocationContext,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            hoist: HoistConfig::default(),
            concurrency: 4,
            client: ClientConfig::default(),
            filter: PackageFilter::default(),
            ignore_scripts: false,
            reject_cycles: false,
            context: InvocationContext::Direct,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct BootstrapReport {
    /// Number of packages operated on after filtering.
    pub packages: usize,
    /// Non-fatal diagnostics collected across all stages.
    pub warnings: Vec<Warning>,
}

/// Bootstrap the repository rooted at `root_dir` using the configured
/// external client.
///
/// # Errors
/// The first fatal error of any stage: `CONFIG_INVALID`, `DEP_CYCLE`,
/// `SCRIPT_FAILED`, `INSTALL_FAILED`, or a manifest/workspace error.
pub async fn bootstrap(
    root_dir: &Path,
    options: &BootstrapOptions,
) -> Result<BootstrapReport, BootstrapError> {
    let client = NpmClient::new(options.client.clone());
    bootstrap_with(root_dir, options, &client).await
}

/// Bootstrap with a caller-supplied installer.
pub async fn bootstrap_with<I: Installer + Sync>(
    root_dir: &Path,
    options: &BootstrapOptions,
    installer: &I,
) -> Result<BootstrapReport, BootstrapError> {
    // Configuration checks come before any filesystem mutation.
    if options.concurrency == 0 {
        return Err(BootstrapError::config_invalid("concurrency must be at least 1"));
    }
    if options.hoist.is_enabled() && options.client.native_workspaces {
        return Err(BootstrapError::config_invalid(
            "hoisting is incompatible with client-managed workspaces",
        ));
    }

    let (root, packages) = workspaces::discover(root_dir)?;
    let graph = PackageGraph::new(packages);
    let filtered: Vec<&Package> = options.filter.apply(&graph);

    tracing::info!(
        total = graph.len(),
        filtered = filtered.len(),
        root = %root.location.display(),
        "bootstrapping repository"
    );

    let mut warnings: Vec<Warning> = Vec::new();
    let batches = topological_batches(&graph, &filtered, options.reject_cycles, &mut warnings)?;

    if !options.ignore_scripts {
        run_stage(
            LifecycleStage::Preinstall,
            &root,
            &batches,
            options.concurrency,
            options.context,
        )
        .await?;
    }

    let plan = hoist::plan(&graph, &filtered, &root, &options.hoist, &mut warnings);
    tracing::debug!(
        root_set = plan.root.len(),
        leaf_targets = plan.leaves.len(),
        satisfied = plan.is_fully_satisfied(),
        "install plan ready"
    );

    warnings.extend(install::apply(&plan, &graph, &root, installer, options.concurrency).await?);
    warnings.extend(link::link_local_dependencies(&graph, &filtered, options.concurrency).await);

    if !options.ignore_scripts {
        for stage in LifecycleStage::AFTER_INSTALL {
            run_stage(stage, &root, &batches, options.concurrency, options.context).await?;
        }
    }

    for warning in &warnings {
        tracing::warn!(code = warning.code, "{}", warning.message);
    }

    Ok(BootstrapReport {
        packages: filtered.len(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::MockInstaller;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_root(dir: &Path, extra: &str) {
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name": "monorepo", "workspaces": ["packages/*"]{extra}}}"#),
        )
        .unwrap();
    }

    fn write_member(root: &Path, name: &str, body: &str) {
        let dir = root.join("packages").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("package.json"),
            format!(r#"{{"name": "{name}", "version": "1.0.0"{body}}}"#),
        )
        .unwrap();
    }

    #[test]
    fn test_hoist_with_native_workspaces_rejected() {
        let options = BootstrapOptions {
            hoist: HoistConfig::All,
            client: ClientConfig {
                native_workspaces: true,
                ..ClientConfig::default()
            },
            ..BootstrapOptions::default()
        };

        let err = futures::executor::block_on(bootstrap_with(
            Path::new("/nonexistent"),
            &options,
            &MockInstaller::default(),
        ))
        .unwrap_err();

        assert_eq!(err.code(), crate::error::codes::CONFIG_INVALID);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let options = BootstrapOptions {
            concurrency: 0,
            ..BootstrapOptions::default()
        };

        let err = futures::executor::block_on(bootstrap_with(
            Path::new("/nonexistent"),
            &options,
            &MockInstaller::default(),
        ))
        .unwrap_err();

        assert_eq!(err.code(), crate::error::codes::CONFIG_INVALID);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_full_waterfall() {
        let dir = tempdir().unwrap();
        write_root(dir.path(), "");
        write_member(
            dir.path(),
            "app",
            r#", "dependencies": {"lib": "^1.0.0"},
               "scripts": {"postinstall": "echo app >> ../../order.txt"}"#,
        );
        write_member(
            dir.path(),
            "lib",
            r#", "dependencies": {"lodash": "^4.0.0"},
               "scripts": {"postinstall": "echo lib >> ../../order.txt"}"#,
        );

        let installer = MockInstaller::default();
        let report = bootstrap_with(dir.path(), &BootstrapOptions::default(), &installer)
            .await
            .unwrap();

        assert_eq!(report.packages, 2);

        // lib's external dependency was installed into lib, in one call
        let lib_dir = dir.path().join("packages").join("lib");
        let calls = installer.calls_for(&lib_dir);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ["lodash@^4.0.0"]);

        // app -> lib got linked
        let link = dir.path().join("packages/app/node_modules/lib");
        assert!(tether_util::fs::is_symlink_to(&link, &lib_dir));

        // scripts ran in dependency order
        let order = fs::read_to_string(dir.path().join("order.txt")).unwrap();
        assert_eq!(order, "lib\napp\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_install_aborts_later_stages() {
        let dir = tempdir().unwrap();
        write_root(dir.path(), "");
        write_member(
            dir.path(),
            "app",
            r#", "dependencies": {"lodash": "^4.0.0"},
               "scripts": {"preinstall": "echo pre > pre.txt",
                           "postinstall": "echo post > post.txt"}"#,
        );

        let app_dir = dir.path().join("packages").join("app");
        let installer = MockInstaller::failing_for(app_dir.clone());

        let err = bootstrap_with(dir.path(), &BootstrapOptions::default(), &installer)
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::codes::INSTALL_FAILED);

        // preinstall already completed; postinstall never started
        assert!(app_dir.join("pre.txt").exists());
        assert!(!app_dir.join("post.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ignore_scripts_skips_lifecycle_but_not_links() {
        let dir = tempdir().unwrap();
        write_root(dir.path(), "");
        write_member(
            dir.path(),
            "app",
            r#", "dependencies": {"lib": "^1.0.0"},
               "scripts": {"postinstall": "echo post > post.txt"}"#,
        );
        write_member(dir.path(), "lib", "");

        let installer = MockInstaller::default();
        let options = BootstrapOptions {
            ignore_scripts: true,
            ..BootstrapOptions::default()
        };
        bootstrap_with(dir.path(), &options, &installer)
            .await
            .unwrap();

        let app_dir = dir.path().join("packages").join("app");
        assert!(!app_dir.join("post.txt").exists());
        assert!(tether_util::fs::is_symlink_to(
            &app_dir.join("node_modules/lib"),
            &dir.path().join("packages/lib"),
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hoisted_bootstrap_installs_at_root() {
        let dir = tempdir().unwrap();
        write_root(dir.path(), r#", "dependencies": {"lodash": "^4.0.0"}"#);
        write_member(
            dir.path(),
            "p1",
            r#", "dependencies": {"lodash": "^4.0.0"}"#,
        );
        write_member(
            dir.path(),
            "p2",
            r#", "dependencies": {"lodash": "^3.0.0"}"#,
        );

        let installer = MockInstaller::default();
        let options = BootstrapOptions {
            hoist: HoistConfig::All,
            ignore_scripts: true,
            ..BootstrapOptions::default()
        };
        let report = bootstrap_with(dir.path(), &options, &installer)
            .await
            .unwrap();

        // Root got the root-declared version in one call
        let root_calls = installer.calls_for(dir.path());
        assert_eq!(root_calls.len(), 1);
        assert_eq!(root_calls[0], ["lodash@^4.0.0"]);

        // p2 keeps its own incompatible version, with a warning
        let p2_calls = installer.calls_for(&dir.path().join("packages/p2"));
        assert_eq!(p2_calls.len(), 1);
        assert_eq!(p2_calls[0], ["lodash@^3.0.0"]);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.code == crate::error::warnings::EHOIST_PKG_VERSION));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cycle_rejected_before_any_install() {
        let dir = tempdir().unwrap();
        write_root(dir.path(), "");
        write_member(dir.path(), "a", r#", "dependencies": {"b": "^1.0.0"}"#);
        write_member(dir.path(), "b", r#", "dependencies": {"a": "^1.0.0"}"#);

        let installer = MockInstaller::default();
        let options = BootstrapOptions {
            reject_cycles: true,
            ..BootstrapOptions::default()
        };

        let err = bootstrap_with(dir.path(), &options, &installer)
            .await
            .unwrap_err();

        assert_eq!(err.code(), crate::error::codes::DEP_CYCLE);
        assert_eq!(installer.call_count(), 0);
    }
}
