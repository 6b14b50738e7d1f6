//! Lifecycle stage execution across topological batches.
//!
//! The root manifest's script runs exactly once, synchronously, then each
//! batch runs in order with intra-batch parallelism up to the configured
//! bound. No package's script starts before all of its local dependencies'
//! scripts have completed; within a batch there is no ordering guarantee.

use crate::error::BootstrapError;
use crate::graph::Package;
use crate::progress::Progress;
use crate::scripts;
use crate::workspaces::RootProject;
use futures::stream::{self, StreamExt};
use std::fmt;

/// A named point at which package-declared scripts may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Preinstall,
    Install,
    Postinstall,
    Prepublish,
    Prepare,
}

impl LifecycleStage {
    /// Stages that run after installs and linking, in order.
    pub const AFTER_INSTALL: [Self; 4] = [
        Self::Install,
        Self::Postinstall,
        Self::Prepublish,
        Self::Prepare,
    ];

    /// The script name in the manifest.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preinstall => "preinstall",
            Self::Install => "install",
            Self::Postinstall => "postinstall",
            Self::Prepublish => "prepublish",
            Self::Prepare => "prepare",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How this process came to run: directly, or as a child spawned by one of
/// its own lifecycle scripts. Threaded explicitly through the call tree;
/// the environment is consulted once at the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationContext {
    #[default]
    Direct,
    Nested,
}

impl InvocationContext {
    /// Detect nesting from the paired environment markers set for script
    /// children.
    #[must_use]
    pub fn from_env() -> Self {
        let marked = std::env::var_os(scripts::ENV_BOOTSTRAP).is_some()
            && std::env::var_os(scripts::ENV_LIFECYCLE_EVENT).is_some();
        if marked {
            Self::Nested
        } else {
            Self::Direct
        }
    }
}

/// Run one lifecycle stage: root first, then every batch in order.
///
/// The root script is skipped for nested invocations (recursive
/// self-invocation guard). A missing script on any package is a silent
/// no-op.
///
/// # Errors
/// `SCRIPT_FAILED` on the first script that exits non-zero; later batches
/// do not start.
pub async fn run_stage(
    stage: LifecycleStage,
    root: &RootProject,
    batches: &[Vec<&Package>],
    concurrency: usize,
    context: InvocationContext,
) -> Result<(), BootstrapError> {
    if context == InvocationContext::Nested {
        tracing::debug!(%stage, "nested invocation, skipping root script");
    } else {
        let root_name = root.manifest.name.as_deref().unwrap_or("root");
        scripts::run_script(
            root_name,
            &root.location,
            &root.manifest,
            stage.as_str(),
            &root.bin_dir(),
        )
        .await?;
    }

    let total: usize = batches.iter().map(Vec::len).sum();
    let progress = Progress::new(format!("scripts:{stage}"), total);
    let root_bin = root.bin_dir();

    for batch in batches {
        let results: Vec<Result<(), BootstrapError>> = stream::iter(batch)
            .map(|pkg| {
                let progress = progress.clone();
                let root_bin = &root_bin;
                async move {
                    scripts::run_script(
                        pkg.name(),
                        pkg.location(),
                        pkg.manifest(),
                        stage.as_str(),
                        root_bin,
                    )
                    .await?;
                    progress.tick(pkg.name());
                    Ok(())
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        for result in results {
            result?;
        }
    }

    Ok(())
}
