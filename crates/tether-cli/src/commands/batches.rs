//! `tether batches` command implementation.
//!
//! Print the topological install batches, a debugging surface for the
//! batching rules the bootstrap run follows.

use miette::Result;
use std::path::Path;
use tether_core::graph::{Package, PackageGraph};
use tether_core::topological_batches;
use tether_core::workspaces::{discover, find_root};

/// Run the batches command.
pub fn run(cwd: &Path, reject_cycles: bool, json: bool) -> Result<()> {
    let root = find_root(cwd).unwrap_or_else(|| cwd.to_path_buf());

    let graph = match discover(&root) {
        Ok((_, packages)) => PackageGraph::new(packages),
        Err(e) => return fail(&e, json),
    };

    let subset: Vec<&Package> = graph.packages().collect();
    let mut warnings = Vec::new();

    let batches = match topological_batches(&graph, &subset, reject_cycles, &mut warnings) {
        Ok(batches) => batches,
        Err(e) => return fail(&e, json),
    };

    if json {
        let levels: Vec<Vec<&str>> = batches
            .iter()
            .map(|batch| batch.iter().map(|p| p.name()).collect())
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "batches": levels,
                "warnings": warnings
                    .iter()
                    .map(|w| serde_json::json!({"code": w.code, "message": w.message}))
                    .collect::<Vec<_>>()
            })
        );
    } else {
        for (index, batch) in batches.iter().enumerate() {
            let names: Vec<&str> = batch.iter().map(|p| p.name()).collect();
            println!("{}: {}", index + 1, names.join(", "));
        }
        for warning in &warnings {
            eprintln!("warning: {warning}");
        }
    }

    Ok(())
}

fn fail(error: &tether_core::BootstrapError, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": false,
                "error": { "code": error.code(), "message": error.message() }
            })
        );
    } else {
        eprintln!("error: {error}");
    }
    std::process::exit(1);
}
