//! nodeprep library
//!
//! Build steps for packaging a Node.js service: install production
//! dependencies, flatten the dependency tree on platforms with short path
//! limits, prune non-runtime directories, and clean generated outputs.

pub mod builder;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod flatten;
pub mod package_manager;
pub mod platform;
pub mod process_guard;
pub mod prune;
pub mod rules;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::Builder;
pub use cleanup::{CleanupReport, RemovalOutcome, RemoveOptions};
pub use config::{BuildConfig, MatchMode};
pub use error::{BuildError, Result};
pub use flatten::{FlattenReport, PackageName, flatten_dependencies};
pub use package_manager::{InstallStatus, NpmInstaller, PackageInstaller};
pub use platform::Platform;
pub use prune::{PruneReport, prune_dependencies, prune_reason};
pub use rules::{Rule, run_rules};
