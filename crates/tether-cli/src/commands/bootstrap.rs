//! `tether bootstrap` command implementation.

use miette::Result;
use serde::Serialize;
use std::path::Path;
use tether_core::{
    bootstrap, BootstrapOptions, ClientConfig, HoistConfig, InvocationContext, PackageFilter,
};

/// Parsed bootstrap flags.
#[derive(Debug)]
pub struct Flags {
    pub hoist: Vec<String>,
    pub nohoist: Vec<String>,
    pub scope: Vec<String>,
    pub ignore: Vec<String>,
    pub concurrency: usize,
    pub npm_client: String,
    pub npm_client_args: Vec<String>,
    pub use_workspaces: bool,
    pub mutex: Option<String>,
    pub ignore_scripts: bool,
    pub reject_cycles: bool,
}

impl Flags {
    fn hoist_config(&self) -> HoistConfig {
        if self.hoist.is_empty() {
            HoistConfig::None
        } else if self.hoist.iter().any(|g| g == "**") && self.nohoist.is_empty() {
            HoistConfig::All
        } else {
            HoistConfig::Patterns {
                include: self.hoist.clone(),
                exclude: self.nohoist.clone(),
            }
        }
    }
}

/// Result for JSON output.
#[derive(Serialize)]
struct BootstrapResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<WarningInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorInfo>,
}

/// Warning info for JSON output.
#[derive(Serialize)]
struct WarningInfo {
    code: &'static str,
    message: String,
}

/// Error info for JSON output.
#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
}

/// Run the bootstrap command.
pub async fn run(cwd: &Path, flags: Flags, json: bool) -> Result<()> {
    let root = tether_core::find_root(cwd).unwrap_or_else(|| cwd.to_path_buf());

    let filter = match PackageFilter::new(&flags.scope, &flags.ignore) {
        Ok(filter) => filter,
        Err(e) => return fail(&e, json),
    };

    let options = BootstrapOptions {
        hoist: flags.hoist_config(),
        concurrency: flags.concurrency,
        client: ClientConfig {
            program: flags.npm_client.clone(),
            extra_args: flags.npm_client_args.clone(),
            mutex: flags.mutex.clone(),
            native_workspaces: flags.use_workspaces,
        },
        filter,
        ignore_scripts: flags.ignore_scripts,
        reject_cycles: flags.reject_cycles,
        context: InvocationContext::from_env(),
    };

    match bootstrap(&root, &options).await {
        Ok(report) => {
            if json {
                let result = BootstrapResult {
                    ok: true,
                    packages: Some(report.packages),
                    warnings: report
                        .warnings
                        .iter()
                        .map(|w| WarningInfo {
                            code: w.code,
                            message: w.message.clone(),
                        })
                        .collect(),
                    error: None,
                };
                println!("{}", serde_json::to_string_pretty(&result).unwrap());
            } else {
                for warning in &report.warnings {
                    eprintln!("warning: {warning}");
                }
                println!("Bootstrapped {} package(s)", report.packages);
            }
            Ok(())
        }
        Err(e) => fail(&e, json),
    }
}

fn fail(error: &tether_core::BootstrapError, json: bool) -> Result<()> {
    if json {
        let result = BootstrapResult {
            ok: false,
            packages: None,
            warnings: Vec::new(),
            error: Some(ErrorInfo {
                code: error.code(),
                message: error.message().to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        eprintln!("error: {error}");
    }
    std::process::exit(1);
}
