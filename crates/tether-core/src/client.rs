//! External package-installation client invocation.
//!
//! The actual fetch/extract of external packages is delegated to an
//! npm-compatible client; this module owns the process invocation and the
//! [`Installer`] seam the orchestrator is generic over.

use crate::error::BootstrapError;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;

/// Installs a list of `name@range` specifiers into a target location.
pub trait Installer {
    /// Install `specs` into `target`. One call per distinct target; the
    /// caller never splits a target's specifiers across calls.
    fn install(
        &self,
        target: &Path,
        specs: &[String],
    ) -> impl Future<Output = Result<(), BootstrapError>> + Send;
}

/// External client selection and invocation options.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client program, e.g. `npm`, `yarn`, `pnpm`.
    pub program: String,
    /// Extra arguments appended to every install invocation.
    pub extra_args: Vec<String>,
    /// Mutex token for safe concurrent yarn invocation (`--mutex <token>`).
    pub mutex: Option<String>,
    /// The client manages workspaces natively; incompatible with hoisting.
    pub native_workspaces: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            extra_args: Vec::new(),
            mutex: None,
            native_workspaces: false,
        }
    }
}

impl ClientConfig {
    /// Whether the configured client is yarn (mutex handling applies).
    #[must_use]
    pub fn uses_yarn(&self) -> bool {
        Path::new(&self.program).file_stem().and_then(|s| s.to_str()) == Some("yarn")
    }
}

/// Process-backed [`Installer`] driving the configured client.
#[derive(Debug, Clone)]
pub struct NpmClient {
    config: ClientConfig,
}

impl NpmClient {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Arguments for one install invocation.
    fn install_args(&self, specs: &[String]) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        args.extend(specs.iter().cloned());
        if self.config.uses_yarn() {
            if let Some(token) = &self.config.mutex {
                args.push(format!("--mutex={token}"));
            }
        }
        args.extend(self.config.extra_args.iter().cloned());
        args
    }
}

impl Installer for NpmClient {
    async fn install(&self, target: &Path, specs: &[String]) -> Result<(), BootstrapError> {
        let args = self.install_args(specs);
        tracing::debug!(
            target = %target.display(),
            program = %self.config.program,
            count = specs.len(),
            "installing dependencies"
        );

        let output = tokio::process::Command::new(&self.config.program)
            .args(&args)
            .current_dir(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                BootstrapError::install_failed(format!(
                    "Failed to spawn {}: {e}",
                    self.config.program
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BootstrapError::install_failed(format!(
                "{} install exited with {} in {}: {}",
                self.config.program,
                output.status,
                target.display(),
                tail(&stderr, 400)
            )));
        }

        Ok(())
    }
}

/// The last `max` characters of process output, for error messages.
fn tail(text: &str, max: usize) -> &str {
    let trimmed = text.trim_end();
    match trimmed.char_indices().nth_back(max.saturating_sub(1)) {
        Some((idx, _)) => &trimmed[idx..],
        None => trimmed,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records install calls; optionally fails for one target.
    #[derive(Debug, Default)]
    pub struct MockInstaller {
        pub calls: Mutex<Vec<(PathBuf, Vec<String>)>>,
        pub fail_for: Option<PathBuf>,
    }

    impl MockInstaller {
        pub fn failing_for(target: PathBuf) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_for: Some(target),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls_for(&self, target: &Path) -> Vec<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| t == target)
                .map(|(_, specs)| specs.clone())
                .collect()
        }
    }

    impl Installer for MockInstaller {
        async fn install(&self, target: &Path, specs: &[String]) -> Result<(), BootstrapError> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_path_buf(), specs.to_vec()));
            if self.fail_for.as_deref() == Some(target) {
                return Err(BootstrapError::install_failed(format!(
                    "mock failure for {}",
                    target.display()
                )));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_args_npm() {
        let client = NpmClient::new(ClientConfig::default());
        let specs = vec!["lodash@^4.0.0".to_string(), "react@^18.0.0".to_string()];

        let args = client.install_args(&specs);
        assert_eq!(args, ["install", "lodash@^4.0.0", "react@^18.0.0"]);
    }

    #[test]
    fn test_install_args_yarn_mutex() {
        let client = NpmClient::new(ClientConfig {
            program: "yarn".to_string(),
            mutex: Some("network:42424".to_string()),
            ..ClientConfig::default()
        });

        let args = client.install_args(&["a@1.0.0".to_string()]);
        assert_eq!(args, ["install", "a@1.0.0", "--mutex=network:42424"]);
    }

    #[test]
    fn test_mutex_ignored_for_npm() {
        let client = NpmClient::new(ClientConfig {
            mutex: Some("network:42424".to_string()),
            ..ClientConfig::default()
        });

        let args = client.install_args(&["a@1.0.0".to_string()]);
        assert_eq!(args, ["install", "a@1.0.0"]);
    }

    #[test]
    fn test_extra_args_appended_last() {
        let client = NpmClient::new(ClientConfig {
            extra_args: vec!["--registry".to_string(), "http://localhost:4873".to_string()],
            ..ClientConfig::default()
        });

        let args = client.install_args(&["a@1.0.0".to_string()]);
        assert_eq!(
            args,
            ["install", "a@1.0.0", "--registry", "http://localhost:4873"]
        );
    }

    #[test]
    fn test_uses_yarn() {
        let yarn = ClientConfig {
            program: "/usr/local/bin/yarn".to_string(),
            ..ClientConfig::default()
        };
        assert!(yarn.uses_yarn());
        assert!(!ClientConfig::default().uses_yarn());
    }

    #[test]
    fn test_tail_truncates() {
        let text = "x".repeat(1000);
        assert_eq!(tail(&text, 400).len(), 400);
        assert_eq!(tail("short", 400), "short");
    }
}
