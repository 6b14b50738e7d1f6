//! `tether list` command implementation.
//!
//! List workspace packages discovered from the root manifest.

use miette::Result;
use std::path::Path;
use tether_core::workspaces::{discover, find_root};

/// Run the list command.
pub fn run(cwd: &Path, json: bool) -> Result<()> {
    let root = find_root(cwd).unwrap_or_else(|| cwd.to_path_buf());

    let (project, packages) = match discover(&root) {
        Ok(found) => found,
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": e.code(), "message": e.message() }
                    })
                );
            } else {
                eprintln!("error: {e}");
                eprintln!("hint: Add a \"workspaces\" field to package.json");
            }
            std::process::exit(1);
        }
    };

    if json {
        let pkg_list: Vec<_> = packages
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name(),
                    "version": p.version(),
                    "path": p.location().to_string_lossy()
                })
            })
            .collect();

        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "root": project.location.to_string_lossy(),
                "packages": pkg_list
            })
        );
    } else {
        println!("Workspace root: {}", project.location.display());
        println!();
        println!("Packages ({}):", packages.len());
        for pkg in &packages {
            println!("  {} @ {}", pkg.name(), pkg.version());
            println!("    {}", pkg.location().display());
        }
    }

    Ok(())
}
