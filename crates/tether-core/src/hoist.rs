//! Dependency aggregation and root-vs-leaf placement planning.
//!
//! Walks the filtered package set and the root manifest, aggregating every
//! external requirement into an insertion-ordered name -> range -> dependents
//! map, then applies the hoist predicate and common-version rule to produce
//! an [`InstallPlan`]. Deterministic given identical inputs and disk state.

use crate::error::{warnings, Warning};
use crate::graph::{Package, PackageGraph};
use crate::manifest::Manifest;
use crate::version::version_satisfies;
use crate::workspaces::RootProject;
use indexmap::{IndexMap, IndexSet};
use std::path::Path;

/// Which external dependency names are hoisted to the repository root.
#[derive(Debug, Clone, Default)]
pub enum HoistConfig {
    /// Nothing is hoisted (the default).
    #[default]
    None,
    /// Every external dependency is hoisted.
    All,
    /// Names matching an include glob and no exclude glob are hoisted.
    Patterns {
        include: Vec<String>,
        exclude: Vec<String>,
    },
}

impl HoistConfig {
    /// Whether hoisting is enabled at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether the named dependency is hoisted to the root.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Patterns { include, exclude } => {
                glob_any(include, name) && !glob_any(exclude, name)
            }
        }
    }
}

fn glob_any(patterns: &[String], name: &str) -> bool {
    patterns.iter().any(|p| {
        glob::Pattern::new(p)
            .map(|pat| pat.matches(name))
            .unwrap_or(false)
    })
}

/// A dependency installed once at the repository root.
#[derive(Debug, Clone)]
pub struct RootInstall {
    /// External dependency name.
    pub name: String,
    /// Version range chosen by the common-version rule.
    pub range: String,
    /// Filtered packages whose requirement this root copy serves.
    pub dependents: Vec<String>,
    /// Whether a compatible copy already exists at the root.
    pub satisfied: bool,
}

impl RootInstall {
    /// The `name@range` specifier handed to the external client.
    #[must_use]
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.range)
    }
}

/// A dependency installed inside one leaf package.
#[derive(Debug, Clone)]
pub struct LeafInstall {
    pub name: String,
    pub range: String,
    /// Whether a compatible copy already exists in the leaf.
    pub satisfied: bool,
}

impl LeafInstall {
    /// The `name@range` specifier handed to the external client.
    #[must_use]
    pub fn spec(&self) -> String {
        format!("{}@{}", self.name, self.range)
    }
}

/// The placement decision for one run. Produced once, consumed immediately.
#[derive(Debug, Default)]
pub struct InstallPlan {
    /// Dependencies placed at the repository root.
    pub root: Vec<RootInstall>,
    /// Per-package leaf installs, keyed by package name in discovery order.
    pub leaves: IndexMap<String, Vec<LeafInstall>>,
}

impl InstallPlan {
    /// Specifiers for the entire root set.
    #[must_use]
    pub fn root_specs(&self) -> Vec<String> {
        self.root.iter().map(RootInstall::spec).collect()
    }

    /// Whether every candidate placement is already satisfied on disk.
    #[must_use]
    pub fn is_fully_satisfied(&self) -> bool {
        self.root.iter().all(|r| r.satisfied)
            && self
                .leaves
                .values()
                .all(|installs| installs.iter().all(|i| i.satisfied))
    }
}

/// Aggregate external requirements and decide root vs. leaf placement.
///
/// The aggregation map is insertion-ordered: root-manifest dependencies
/// first, then discovery order across the filtered packages. Version
/// conflicts resolve per the common-version rule; satisfaction state is
/// probed against disk sequentially before the plan is returned.
#[must_use]
pub fn plan(
    graph: &PackageGraph,
    filtered: &[&Package],
    root: &RootProject,
    config: &HoistConfig,
    warnings_out: &mut Vec<Warning>,
) -> InstallPlan {
    // name -> range -> dependent package names
    let mut requests: IndexMap<String, IndexMap<String, IndexSet<String>>> = IndexMap::new();

    let root_declared = root.manifest.merged_dependencies();
    for (name, range) in &root_declared {
        requests
            .entry(name.clone())
            .or_default()
            .entry(range.clone())
            .or_default();
    }

    for pkg in filtered {
        for (name, range) in graph.external_dependencies(pkg.name()) {
            requests
                .entry(name.clone())
                .or_default()
                .entry(range.clone())
                .or_default()
                .insert(pkg.name().to_string());
        }
    }

    let mut plan = InstallPlan::default();

    for (name, ranges) in &requests {
        if config.matches(name) {
            hoist_one(name, ranges, root_declared.get(name), &mut plan, warnings_out);
        } else {
            // A root-declared name is always a root action, leaf consumers
            // or not, so binaries link correctly even when already present.
            if let Some(declared) = root_declared.get(name) {
                plan.root.push(RootInstall {
                    name: name.clone(),
                    range: declared.clone(),
                    dependents: Vec::new(),
                    satisfied: false,
                });
            }
            for (range, dependents) in ranges {
                for dependent in dependents {
                    push_leaf(&mut plan, dependent, name, range);
                }
            }
        }
    }

    probe_satisfaction(&mut plan, graph, root);
    plan
}

/// Apply the common-version rule to one hoisted name.
fn hoist_one(
    name: &str,
    ranges: &IndexMap<String, IndexSet<String>>,
    root_declared: Option<&String>,
    plan: &mut InstallPlan,
    warnings_out: &mut Vec<Warning>,
) {
    // Most-requested range among the leaves; ties go to the first
    // encountered in insertion order. Empty dependent sets are not
    // candidates.
    let mut most_requested: Option<(&String, usize)> = None;
    for (range, dependents) in ranges {
        if dependents.is_empty() {
            continue;
        }
        let beats = match most_requested {
            None => true,
            Some((_, count)) => dependents.len() > count,
        };
        if beats {
            most_requested = Some((range, dependents.len()));
        }
    }

    let chosen = match root_declared {
        Some(declared) => {
            // The root's own declared version wins regardless of popularity.
            if let Some((top, _)) = most_requested {
                if top != declared {
                    warnings_out.push(Warning::new(
                        warnings::EHOIST_ROOT_VERSION,
                        format!(
                            "The repository root depends on {name}@{declared} \
                             instead of the more common {name}@{top}."
                        ),
                    ));
                }
            }
            declared.clone()
        }
        // Nothing to reduce over: skip, no warning.
        None => match most_requested {
            Some((range, _)) => range.clone(),
            None => return,
        },
    };

    let dependents: Vec<String> = ranges
        .get(&chosen)
        .map(|set| set.iter().cloned().collect())
        .unwrap_or_default();

    plan.root.push(RootInstall {
        name: name.to_string(),
        range: chosen.clone(),
        dependents,
        satisfied: false,
    });

    // Every other requested range stays in the requesting leaves.
    for (range, dependents) in ranges {
        if *range == chosen {
            continue;
        }
        for dependent in dependents {
            warnings_out.push(Warning::new(
                warnings::EHOIST_PKG_VERSION,
                format!(
                    "\"{dependent}\" depends on {name}@{range} instead of the \
                     hoisted {name}@{chosen}."
                ),
            ));
            push_leaf(plan, dependent, name, range);
        }
    }
}

fn push_leaf(plan: &mut InstallPlan, dependent: &str, name: &str, range: &str) {
    plan.leaves
        .entry(dependent.to_string())
        .or_default()
        .push(LeafInstall {
            name: name.to_string(),
            range: range.to_string(),
            satisfied: false,
        });
}

/// Probe on-disk satisfaction for every candidate placement.
///
/// Probes are deliberately sequential to bound filesystem contention.
fn probe_satisfaction(plan: &mut InstallPlan, graph: &PackageGraph, root: &RootProject) {
    let root_modules = root.modules_dir();
    for entry in &mut plan.root {
        entry.satisfied = is_satisfied(&root_modules, &entry.name, &entry.range);
    }

    for (pkg_name, installs) in &mut plan.leaves {
        let Some(pkg) = graph.get(pkg_name) else {
            continue;
        };
        let modules = pkg.modules_dir();
        for install in installs {
            install.satisfied = is_satisfied(&modules, &install.name, &install.range);
        }
    }
}

/// Whether `modules_dir` already holds a copy of `name` satisfying `range`.
fn is_satisfied(modules_dir: &Path, name: &str, range: &str) -> bool {
    let installed = Manifest::read_lenient(&modules_dir.join(name));
    installed
        .version
        .as_deref()
        .is_some_and(|version| version_satisfies(version, range))
}
