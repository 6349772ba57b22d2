//! Rule procedures: the build pipeline and its cleanup-only variants.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cleanup::{self, CleanupReport, RemoveOptions, try_remove_dir};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::flatten::{self, FlattenReport};
use crate::package_manager::PackageInstaller;
use crate::platform::Platform;
use crate::prune::{self, PruneReport};

/// Everything a rule needs, passed explicitly instead of relying on the
/// process working directory
#[derive(Debug)]
pub struct Builder<I> {
    root: PathBuf,
    platform: Platform,
    config: BuildConfig,
    dry_run: bool,
    installer: I,
}

impl<I: PackageInstaller> Builder<I> {
    pub fn new(
        root: impl Into<PathBuf>,
        platform: Platform,
        config: BuildConfig,
        installer: I,
    ) -> Self {
        Self {
            root: root.into(),
            platform,
            config,
            dry_run: false,
            installer,
        }
    }

    /// Report deletions and moves without touching the disk or running the
    /// package manager
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn installer(&self) -> &I {
        &self.installer
    }

    fn remove_options(&self) -> RemoveOptions {
        RemoveOptions::from_config(&self.config, self.dry_run)
    }

    fn dependency_root(&self) -> PathBuf {
        self.root.join(&self.config.dependency_dir)
    }

    /// Full build: clean, install, flatten where the platform needs it, prune.
    ///
    /// An install failure returns before anything after it runs.
    pub fn build(&mut self) -> Result<()> {
        self.clean_outputs();
        self.clean_dependencies()?;

        info!("Install Dependencies ...");
        if self.dry_run {
            info!("[DRY RUN] skipping package manager install");
        } else {
            self.installer.install(&self.root, &[])?.ensure_success()?;
        }

        if self.platform.flattens_dependencies() {
            self.flatten()?;
        }

        self.prune()?;
        info!("Build successful");
        Ok(())
    }

    /// Delete generated files (log, packaged binaries)
    pub fn clean_outputs(&self) -> CleanupReport {
        cleanup::clean_outputs(&self.root, &self.config, self.platform, self.dry_run)
    }

    /// Delete the dependency directory and generated data directories
    pub fn clean_dependencies(&self) -> Result<CleanupReport> {
        cleanup::clean_dependencies(&self.root, &self.config, self.remove_options())
    }

    /// Prune non-runtime directories from the installed dependencies
    pub fn prune(&self) -> Result<PruneReport> {
        prune::prune_dependencies(&self.root, &self.config, self.remove_options())
    }

    /// Flatten the dependency tree, then put back the packages whose
    /// native layout flattening breaks.
    pub fn flatten(&mut self) -> Result<FlattenReport> {
        let top = self.dependency_root();
        let report =
            flatten::flatten_dependencies(&top, &self.config.dependency_dir, self.dry_run)?;

        for name in &self.config.reinstall.remove {
            try_remove_dir(&top.join(name), false, self.remove_options())?;
        }

        for spec in &self.config.reinstall.install {
            if self.dry_run {
                info!("[DRY RUN] would reinstall {}", spec);
                continue;
            }
            info!("Reinstalling {} without flattening", spec);
            let status = self.installer.install(&self.root, std::slice::from_ref(spec))?;
            if !status.success {
                warn!(
                    "Reinstall of {} failed, rc {}",
                    spec,
                    status.exit_code.unwrap_or(-1)
                );
            }
        }

        Ok(report)
    }
}
