//! Dependency tree flattening.
//!
//! npm may nest a package's own dependencies inside it
//! (`node_modules/a/node_modules/b/...`), which produces paths longer than
//! the Windows limit. Flattening moves every nested package up into the
//! top-level dependency directory unless a package of the same name is
//! already there. The first package to claim a name keeps it.
//!
//! # Algorithm
//!
//! A worklist of top-level packages. Popping a package inspects its nested
//! dependency directory; every nested package whose name is free at the top
//! level is moved there and pushed onto the worklist, so grandchildren that
//! a move exposes are flattened in turn. Names are only ever added to the
//! top level, so each name is moved at most once and the loop terminates.
//! This reaches the same fixed point as rescanning the whole top level until
//! a pass moves nothing.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Result;

/// A package directory name, optionally under an `@scope` directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName {
    pub scope: Option<String>,
    pub name: String,
}

impl PackageName {
    /// Location of this package inside a dependency directory
    pub fn path_in(&self, dependency_dir: &Path) -> PathBuf {
        match &self.scope {
            Some(scope) => dependency_dir.join(scope).join(&self.name),
            None => dependency_dir.join(&self.name),
        }
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}/{}", scope, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Outcome of a flatten run
#[derive(Debug, Default)]
pub struct FlattenReport {
    /// Packages moved (or, in a dry run, that would move) to the top level
    pub moved: Vec<PackageName>,
    /// Nested packages left in place because the top level already has the name
    pub skipped: Vec<PathBuf>,
    /// Nested packages whose move failed
    pub failed: Vec<PathBuf>,
}

/// List the packages directly inside a dependency directory.
///
/// `@scope` directories contribute their children. Dot entries such as
/// `.bin` and anything that is not a real directory are ignored.
pub fn list_packages(dependency_dir: &Path) -> io::Result<Vec<PackageName>> {
    let mut packages = Vec::new();
    for name in subdirectory_names(dependency_dir)? {
        if name.starts_with('@') {
            for inner in subdirectory_names(&dependency_dir.join(&name))? {
                packages.push(PackageName {
                    scope: Some(name.clone()),
                    name: inner,
                });
            }
        } else {
            packages.push(PackageName { scope: None, name });
        }
    }
    packages.sort_by_key(|p| p.to_string());
    Ok(packages)
}

fn subdirectory_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    Ok(names)
}

/// Flatten the dependency directory `top`.
///
/// `dir_name` is the name nested dependency directories go by (normally
/// `node_modules`). In a dry run nothing is moved, but the report lists the
/// moves a real run would make.
pub fn flatten_dependencies(top: &Path, dir_name: &str, dry_run: bool) -> Result<FlattenReport> {
    let mut report = FlattenReport::default();
    if !top.is_dir() {
        warn!("Nothing to flatten: {} does not exist", top.display());
        return Ok(report);
    }
    info!("FLATTENING {}", top.display());

    let initial = list_packages(top)?;
    let mut present: HashSet<PackageName> = initial.iter().cloned().collect();
    let mut worklist: VecDeque<PathBuf> = initial.iter().map(|p| p.path_in(top)).collect();

    while let Some(package_dir) = worklist.pop_front() {
        let nested_dir = package_dir.join(dir_name);
        if !nested_dir.is_dir() {
            continue;
        }

        let nested = match list_packages(&nested_dir) {
            Ok(nested) => nested,
            Err(e) => {
                warn!("Cannot read {}: {}", nested_dir.display(), e);
                continue;
            }
        };

        for package in nested {
            let source = package.path_in(&nested_dir);
            let dest = package.path_in(top);

            if present.contains(&package) || dest.exists() {
                debug!("Keeping {}: {} already at top level", source.display(), package);
                report.skipped.push(source);
                continue;
            }

            if dry_run {
                info!("[DRY RUN] would move {} to {}", source.display(), top.display());
                worklist.push_back(source);
            } else {
                info!("\tMOVING: {} to {}", source.display(), top.display());
                if let Err(e) = move_dir(&source, &dest) {
                    warn!("Failed to move {}: {}", source.display(), e);
                    report.failed.push(source);
                    continue;
                }
                worklist.push_back(dest);
            }
            present.insert(package.clone());
            report.moved.push(package);
        }

        if !dry_run {
            remove_if_unused(&nested_dir);
        }
    }

    info!(
        "Flattened {}: {} moved, {} kept nested",
        top.display(),
        report.moved.len(),
        report.skipped.len()
    );
    Ok(report)
}

fn move_dir(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(source, dest)
}

/// Remove a nested dependency directory once no package is left in it.
///
/// What remains after the moves (`.bin` shims, lock files) refers to the
/// packages that moved away and goes with it. A directory still holding a
/// package (a collision that stayed behind) is kept, minus any scope
/// directories the moves emptied.
fn remove_if_unused(nested_dir: &Path) {
    if let Ok(names) = subdirectory_names(nested_dir) {
        for scope in names.iter().filter(|n| n.starts_with('@')) {
            // Fails harmlessly when the scope still holds packages
            let _ = fs::remove_dir(nested_dir.join(scope));
        }
    }

    match list_packages(nested_dir) {
        Ok(remaining) if remaining.is_empty() => match fs::remove_dir_all(nested_dir) {
            Ok(()) => debug!("Removed emptied {}", nested_dir.display()),
            Err(e) => warn!("Failed to remove {}: {}", nested_dir.display(), e),
        },
        Ok(remaining) => debug!(
            "Leaving {} ({} packages kept nested)",
            nested_dir.display(),
            remaining.len()
        ),
        Err(e) => warn!("Cannot read {}: {}", nested_dir.display(), e),
    }
}
