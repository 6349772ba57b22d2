//! Package-manager invocation.
//!
//! [`PackageInstaller`] is the seam between the build pipeline and the
//! `npm` subprocess. [`NpmInstaller`] is the real implementation; tests
//! drive the pipeline with a recording fake.
//!
//! # Execution
//!
//! The child runs in the project root with stdout/stderr inherited, stdin
//! closed, and in its own process group registered with
//! [`ChildRegistry`](crate::process_guard::ChildRegistry) so an interrupted
//! build does not leave an orphaned install running.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::platform::{Platform, find_program_location};
use crate::process_guard::{CommandProcessGroup, with_registered_child};

/// Result of one package-manager run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallStatus {
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl InstallStatus {
    pub fn ok() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            success: false,
        }
    }

    /// Turn a failed run into [`BuildError::InstallFailed`].
    ///
    /// A child killed by a signal has no exit code and reports 1.
    pub fn ensure_success(&self) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(BuildError::InstallFailed {
                code: self.exit_code.filter(|c| *c != 0).unwrap_or(1),
            })
        }
    }
}

/// Something that can install production dependencies into a project
pub trait PackageInstaller {
    /// Install the project's dependencies, or only `packages` when non-empty.
    ///
    /// `Err` means the installer could not be run at all; a run that exits
    /// non-zero is reported through [`InstallStatus`].
    fn install(&mut self, root: &Path, packages: &[String]) -> Result<InstallStatus>;
}

/// Runs the package-manager executable as a subprocess
#[derive(Debug, Clone)]
pub struct NpmInstaller {
    /// Resolved executable, or the name that could not be found
    program: std::result::Result<PathBuf, String>,
    install_args: Vec<String>,
}

impl NpmInstaller {
    pub fn new(program: impl Into<PathBuf>, install_args: Vec<String>) -> Self {
        Self {
            program: Ok(program.into()),
            install_args,
        }
    }

    /// Build an installer from the configuration and platform.
    ///
    /// `path_list` is the value of `PATH`, consulted only on platforms that
    /// must search for the executable themselves. A missing executable is
    /// only an error once an install is attempted, so rules that never
    /// install still run.
    pub fn from_config(config: &BuildConfig, platform: Platform, path_list: Option<&str>) -> Self {
        let program = resolve_program(config, platform, path_list)
            .map_err(|_| platform.package_manager_program().to_string());
        Self {
            program,
            install_args: config.install_args.clone(),
        }
    }

    /// Full argument list for one run
    pub fn to_cli_args(&self, packages: &[String]) -> Vec<String> {
        self.install_args.iter().chain(packages).cloned().collect()
    }
}

impl PackageInstaller for NpmInstaller {
    fn install(&mut self, root: &Path, packages: &[String]) -> Result<InstallStatus> {
        let program = self
            .program
            .clone()
            .map_err(|program| BuildError::PackageManagerNotFound { program })?;
        let args = self.to_cli_args(packages);
        info!("Running {} {} in {}", program.display(), args.join(" "), root.display());

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(root)
            .stdin(Stdio::null())
            .in_new_process_group()
            .spawn()
            .map_err(|source| BuildError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        let status = with_registered_child(child.id(), || child.wait())?;
        Ok(InstallStatus {
            exit_code: status.code(),
            success: status.success(),
        })
    }
}

/// Work out which executable to run.
///
/// An explicit `package_manager` in the config is used as given. Otherwise
/// the platform default is used, searched for in `path_list` on platforms
/// where `Command` cannot find it unaided.
pub fn resolve_program(
    config: &BuildConfig,
    platform: Platform,
    path_list: Option<&str>,
) -> Result<PathBuf> {
    if let Some(program) = &config.package_manager {
        return Ok(PathBuf::from(program));
    }

    let program = platform.package_manager_program();
    if !platform.searches_path_for_program() {
        return Ok(PathBuf::from(program));
    }

    find_program_location(program, path_list.unwrap_or_default(), platform).ok_or_else(|| {
        BuildError::PackageManagerNotFound {
            program: program.to_string(),
        }
    })
}
