//! Bootstrap error and warning types.

use std::fmt;
use std::io;

/// Fatal error codes.
pub mod codes {
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    pub const DEP_CYCLE: &str = "DEP_CYCLE";
    pub const INSTALL_FAILED: &str = "INSTALL_FAILED";
    pub const LINK_FAILED: &str = "LINK_FAILED";
    pub const SCRIPT_FAILED: &str = "SCRIPT_FAILED";
    pub const MANIFEST_NOT_FOUND: &str = "MANIFEST_NOT_FOUND";
    pub const MANIFEST_INVALID: &str = "MANIFEST_INVALID";
    pub const WORKSPACE_NOT_FOUND: &str = "WORKSPACE_NOT_FOUND";
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Warning codes for non-fatal diagnostics collected during a run.
pub mod warnings {
    /// The root manifest pins a hoisted dependency to a version other than
    /// the most-requested one among the leaves.
    pub const EHOIST_ROOT_VERSION: &str = "EHOIST_ROOT_VERSION";
    /// A leaf requires a version of a hoisted dependency that differs from
    /// the version installed at the root.
    pub const EHOIST_PKG_VERSION: &str = "EHOIST_PKG_VERSION";
    /// A local-dependency cycle was collapsed into a single batch.
    pub const EDEP_CYCLE: &str = "EDEP_CYCLE";
    /// A symlink or executable link could not be created.
    pub const ELINK: &str = "ELINK";
}

/// Bootstrap error with a stable code.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BootstrapError {
    code: &'static str,
    message: String,
}

impl BootstrapError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a configuration error. Raised before any filesystem mutation.
    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::CONFIG_INVALID, msg)
    }

    /// Create a dependency cycle error.
    #[must_use]
    pub fn cycle(members: &[String]) -> Self {
        Self::new(
            codes::DEP_CYCLE,
            format!(
                "Local dependency cycle detected among: {}",
                members.join(", ")
            ),
        )
    }

    /// Create an install failure error.
    pub fn install_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::INSTALL_FAILED, msg)
    }

    /// Create a link failure error.
    pub fn link_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::LINK_FAILED, msg)
    }

    /// Create a lifecycle script failure error.
    #[must_use]
    pub fn script_failed(pkg: &str, stage: &str, detail: &str) -> Self {
        Self::new(
            codes::SCRIPT_FAILED,
            format!("Script '{stage}' failed in {pkg}: {detail}"),
        )
    }

    /// Create a manifest not found error.
    #[must_use]
    pub fn manifest_not_found(path: &std::path::Path) -> Self {
        Self::new(
            codes::MANIFEST_NOT_FOUND,
            format!("package.json not found: {}", path.display()),
        )
    }

    /// Create a manifest invalid error.
    pub fn manifest_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::MANIFEST_INVALID, msg)
    }

    /// Create a workspace not found error.
    #[must_use]
    pub fn workspace_not_found(path: &std::path::Path) -> Self {
        Self::new(
            codes::WORKSPACE_NOT_FOUND,
            format!("No workspace configuration found at {}", path.display()),
        )
    }
}

impl From<io::Error> for BootstrapError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::IO_ERROR, e.to_string())
    }
}

impl From<serde_json::Error> for BootstrapError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(codes::MANIFEST_INVALID, format!("Invalid JSON: {e}"))
    }
}

/// Non-fatal diagnostic collected during a run and reported at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Stable warning code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl Warning {
    /// Create a new warning.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
