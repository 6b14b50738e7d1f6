#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]

//! Core bootstrap engine for tether.
//!
//! Installs and links dependencies across a multi-package repository in a
//! single coordinated pass:
//! - Discovering workspace packages from the root manifest (glob patterns)
//! - Building a package graph with local and external dependency edges
//! - Partitioning the graph into topological batches
//! - Aggregating external requirements and deciding root vs. leaf placement
//! - Driving an external npm-compatible client with bounded parallelism
//! - Symlinking local packages and executables into their dependents
//! - Running lifecycle scripts in dependency order

pub mod batch;
pub mod bootstrap;
pub mod client;
pub mod error;
pub mod filter;
pub mod graph;
pub mod hoist;
pub mod install;
pub mod lifecycle;
pub mod link;
pub mod manifest;
pub mod progress;
pub mod scripts;
pub mod version;
pub mod workspaces;

pub use batch::topological_batches;
pub use bootstrap::{bootstrap, bootstrap_with, BootstrapOptions, BootstrapReport};
pub use client::{ClientConfig, Installer, NpmClient};
pub use error::{codes, warnings, BootstrapError, Warning};
pub use filter::PackageFilter;
pub use graph::{Package, PackageGraph};
pub use hoist::{plan, HoistConfig, InstallPlan, LeafInstall, RootInstall};
pub use install::apply;
pub use lifecycle::{run_stage, InvocationContext, LifecycleStage};
pub use link::link_local_dependencies;
pub use manifest::{read_manifest, BinField, Manifest};
pub use progress::Progress;
pub use version::version_satisfies;
pub use workspaces::{discover, find_root, RootProject};
