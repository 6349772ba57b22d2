//! Removal helpers and the cleanup step.
//!
//! Removal failures are reported, not raised: each attempt produces a
//! [`RemovalOutcome`] that is logged and handed back to the caller. The one
//! exception is a *forced* directory removal, which turns a failure into
//! [`BuildError::ForcedRemoval`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::platform::Platform;

/// What happened to a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    /// Nothing to remove
    Missing,
    /// Removal was attempted and failed
    Failed(String),
    /// Dry run; the path exists and would have been removed
    Skipped,
}

impl RemovalOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Paths touched by a cleanup and what happened to each
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub entries: Vec<(PathBuf, RemovalOutcome)>,
}

impl CleanupReport {
    fn record(&mut self, path: PathBuf, outcome: RemovalOutcome) {
        self.entries.push((path, outcome));
    }

    /// Outcome recorded for `path`, if it was part of this cleanup
    pub fn outcome_for(&self, path: &Path) -> Option<&RemovalOutcome> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, outcome)| outcome)
    }

    pub fn removed(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| *o == RemovalOutcome::Removed)
            .count()
    }
}

/// Options shared by every directory removal
#[derive(Debug, Clone, Copy)]
pub struct RemoveOptions {
    pub dry_run: bool,
    /// How long to wait for a removed directory to disappear from disk
    pub wait: Duration,
}

impl RemoveOptions {
    pub fn from_config(config: &BuildConfig, dry_run: bool) -> Self {
        Self {
            dry_run,
            wait: config.removal_wait(),
        }
    }
}

/// Remove a single file, reporting instead of failing
pub fn try_remove_file(path: &Path, dry_run: bool) -> RemovalOutcome {
    if dry_run {
        return if path.exists() {
            info!("[DRY RUN] would remove file {}", path.display());
            RemovalOutcome::Skipped
        } else {
            info!("File does not exist: {}", path.display());
            RemovalOutcome::Missing
        };
    }

    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed file {}", path.display());
            RemovalOutcome::Removed
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("File does not exist: {}", path.display());
            RemovalOutcome::Missing
        }
        Err(e) => {
            warn!("FAILED TO REMOVE FILE {}: {}", path.display(), e);
            RemovalOutcome::Failed(e.to_string())
        }
    }
}

/// Recursively remove a directory.
///
/// A missing directory is reported and is never an error. With `force`, a
/// failed removal aborts the build.
pub fn try_remove_dir(path: &Path, force: bool, opts: RemoveOptions) -> Result<RemovalOutcome> {
    if !path.exists() {
        info!("Directory does not exist: {}", path.display());
        return Ok(RemovalOutcome::Missing);
    }

    if opts.dry_run {
        info!("[DRY RUN] would remove directory {}", path.display());
        return Ok(RemovalOutcome::Skipped);
    }

    let result = fs::remove_dir_all(path)
        .map_err(|e| e.to_string())
        .and_then(|()| wait_until_gone(path, opts.wait));

    match result {
        Ok(()) => {
            info!("Removed directory {}", path.display());
            Ok(RemovalOutcome::Removed)
        }
        Err(reason) => {
            warn!("FAILED TO REMOVE DIR {}: {}", path.display(), reason);
            if force {
                return Err(BuildError::ForcedRemoval {
                    path: path.to_path_buf(),
                    reason,
                });
            }
            Ok(RemovalOutcome::Failed(reason))
        }
    }
}

/// Spin until `path` no longer exists or `limit` elapses.
///
/// `remove_dir_all` can return before the entry is gone on filesystems that
/// complete deletes lazily.
fn wait_until_gone(path: &Path, limit: Duration) -> std::result::Result<(), String> {
    let start = Instant::now();
    while path.exists() {
        if start.elapsed() >= limit {
            return Err(format!("still present after {:?}", limit));
        }
        std::thread::yield_now();
    }
    Ok(())
}

/// Delete generated build outputs (log file, packaged binaries)
pub fn clean_outputs(
    root: &Path,
    config: &BuildConfig,
    platform: Platform,
    dry_run: bool,
) -> CleanupReport {
    info!("Removing files...");
    let mut report = CleanupReport::default();
    for name in config.output_files(platform) {
        let path = root.join(name);
        let outcome = try_remove_file(&path, dry_run);
        report.record(path, outcome);
    }
    report
}

/// Delete the dependency directory and the generated data directories.
///
/// The dependency directory is removed with `force`: a stale tree left
/// behind would be installed over, so failing to remove it is fatal.
pub fn clean_dependencies(
    root: &Path,
    config: &BuildConfig,
    opts: RemoveOptions,
) -> Result<CleanupReport> {
    info!("Removing node files...");
    let mut report = CleanupReport::default();

    let deps = root.join(&config.dependency_dir);
    let outcome = try_remove_dir(&deps, true, opts)?;
    report.record(deps, outcome);

    for name in &config.cleanup.directories {
        let path = root.join(name);
        let outcome = try_remove_dir(&path, false, opts)?;
        report.record(path, outcome);
    }

    Ok(report)
}
