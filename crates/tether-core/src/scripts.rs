//! Lifecycle script execution.
//!
//! Resolves a stage's script text from the manifest and runs it through the
//! platform shell with `node_modules/.bin` directories prepended to `PATH`.
//! A missing script is a distinct valid outcome, not an error path.

use crate::error::BootstrapError;
use crate::manifest::Manifest;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

/// Marker set for script children spawned by tether. Together with
/// [`ENV_LIFECYCLE_EVENT`] it identifies a nested recursive invocation.
pub const ENV_BOOTSTRAP: &str = "TETHER_BOOTSTRAP";

/// The lifecycle stage that spawned the current script child.
pub const ENV_LIFECYCLE_EVENT: &str = "TETHER_LIFECYCLE_EVENT";

/// Run the named lifecycle script of a package, if declared.
///
/// Returns `Ok(true)` when a script ran to completion, `Ok(false)` when the
/// stage declares no script (silent no-op).
///
/// # Errors
/// `SCRIPT_FAILED` when the script exits non-zero or cannot be spawned.
pub async fn run_script(
    pkg_name: &str,
    location: &Path,
    manifest: &Manifest,
    stage: &str,
    root_bin: &Path,
) -> Result<bool, BootstrapError> {
    let Some(script) = manifest.script(stage) else {
        tracing::debug!(pkg = pkg_name, stage, "no script for stage");
        return Ok(false);
    };

    tracing::debug!(pkg = pkg_name, stage, "running lifecycle script");

    let (shell, flag) = platform_shell();
    let output = tokio::process::Command::new(shell)
        .arg(flag)
        .arg(script)
        .current_dir(location)
        .env("PATH", search_path(location, root_bin))
        .env("npm_lifecycle_event", stage)
        .env(ENV_BOOTSTRAP, "1")
        .env(ENV_LIFECYCLE_EVENT, stage)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| BootstrapError::script_failed(pkg_name, stage, &e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BootstrapError::script_failed(
            pkg_name,
            stage,
            &format!("{} ({})", stderr.trim_end(), output.status),
        ));
    }

    Ok(true)
}

#[cfg(windows)]
fn platform_shell() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

#[cfg(not(windows))]
fn platform_shell() -> (&'static str, &'static str) {
    ("sh", "-c")
}

/// `PATH` for script children: the package's own `.bin`, then the root
/// `.bin`, then the inherited search path.
fn search_path(location: &Path, root_bin: &Path) -> OsString {
    let mut dirs = vec![location.join("node_modules").join(".bin")];
    if root_bin != dirs[0] {
        dirs.push(root_bin.to_path_buf());
    }
    if let Some(existing) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(dirs).unwrap_or_else(|_| OsString::from(""))
}
