//! Topological batching of packages over local dependency edges.

use crate::error::{warnings, BootstrapError, Warning};
use crate::graph::{Package, PackageGraph};
use std::collections::HashSet;

/// Partition `subset` into ordered batches such that every package's local
/// dependencies land in a strictly earlier batch.
///
/// Edges are restricted to the given subset: a local dependency outside the
/// subset imposes no ordering constraint. When the remainder cannot make
/// progress a cycle exists; with `reject_cycles` the run fails, otherwise the
/// tangled remainder is collapsed into one final batch and a warning is
/// recorded.
///
/// # Errors
/// `DEP_CYCLE` when a cycle exists and `reject_cycles` is set.
pub fn topological_batches<'a>(
    graph: &PackageGraph,
    subset: &[&'a Package],
    reject_cycles: bool,
    warnings_out: &mut Vec<Warning>,
) -> Result<Vec<Vec<&'a Package>>, BootstrapError> {
    let subset_names: HashSet<&str> = subset.iter().map(|p| p.name()).collect();

    let mut remaining: Vec<&'a Package> = subset.to_vec();
    let mut resolved: HashSet<String> = HashSet::new();
    let mut batches: Vec<Vec<&'a Package>> = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&'a Package>, Vec<&'a Package>) =
            remaining.iter().copied().partition(|pkg| {
                graph
                    .local_dependencies(pkg.name())
                    .iter()
                    .filter(|dep| subset_names.contains(dep.as_str()))
                    .all(|dep| resolved.contains(dep))
            });

        if ready.is_empty() {
            let members: Vec<String> = blocked.iter().map(|p| p.name().to_string()).collect();
            if reject_cycles {
                return Err(BootstrapError::cycle(&members));
            }
            warnings_out.push(Warning::new(
                warnings::EDEP_CYCLE,
                format!(
                    "Local dependency cycle among {}; running them in one batch",
                    members.join(", ")
                ),
            ));
            tracing::warn!(members = ?members, "dependency cycle collapsed into final batch");
            batches.push(blocked);
            break;
        }

        for pkg in &ready {
            resolved.insert(pkg.name().to_string());
        }
        batches.push(ready);
        remaining = blocked;
    }

    Ok(batches)
}
