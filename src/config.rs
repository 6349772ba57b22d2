//! Build configuration.
//!
//! Every field has a default matching the print-manager build, so a project
//! without a `nodeprep.json` behaves exactly like the stock build. A config
//! file only needs the keys it overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::platform::Platform;

/// File name looked up in the project root when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "nodeprep.json";

/// How prune names are matched against directories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchMode {
    /// Match the directory's own name by prefix; package roots are exempt
    #[default]
    Name,
    /// Match anywhere in the path relative to the root
    Substring,
}

/// Prune step settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    pub names: Vec<String>,
    pub match_mode: MatchMode,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            names: strings(&["test", "example", "src", "tools"]),
            match_mode: MatchMode::Name,
        }
    }
}

/// Generated outputs removed by the cleanup step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Files removed on every platform
    pub files: Vec<String>,
    /// Extra files removed on Windows
    pub windows_files: Vec<String>,
    /// Extra files removed everywhere else
    pub posix_files: Vec<String>,
    /// Generated directories removed alongside the dependency directory
    pub directories: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            files: strings(&["npm-debug.log", "print_manager.jx", "print_manager.jxp"]),
            windows_files: strings(&["node.jxp", "node.exe"]),
            posix_files: strings(&["print_manager"]),
            directories: strings(&["files", "db"]),
        }
    }
}

/// Packages whose native install layout does not survive flattening
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinstallConfig {
    /// Top-level package directories deleted after flattening
    pub remove: Vec<String>,
    /// Package specs installed again, one at a time
    pub install: Vec<String>,
}

impl Default for ReinstallConfig {
    fn default() -> Self {
        Self {
            remove: strings(&["usb", "usb-shyp-win32-ia32", "usb-shyp-win32-x64"]),
            install: strings(&["usb@1.0.5"]),
        }
    }
}

/// Complete build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Explicit package-manager program; `None` uses the platform default
    pub package_manager: Option<String>,
    pub install_args: Vec<String>,
    /// Name of the top-level dependency directory
    pub dependency_dir: String,
    pub prune: PruneConfig,
    pub cleanup: CleanupConfig,
    pub reinstall: ReinstallConfig,
    /// Upper bound on waiting for a removed directory to disappear
    pub removal_wait_ms: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            package_manager: None,
            install_args: strings(&["install", "--production"]),
            dependency_dir: "node_modules".to_string(),
            prune: PruneConfig::default(),
            cleanup: CleanupConfig::default(),
            reinstall: ReinstallConfig::default(),
            removal_wait_ms: 5000,
        }
    }
}

impl BuildConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Resolve the configuration for a project.
    ///
    /// An explicit path must exist. Without one, `<root>/nodeprep.json` is
    /// used when present and the defaults otherwise.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    tracing::debug!("Using config file {}", candidate.display());
                    Self::load_from_file(candidate)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(program) = &self.package_manager {
            if program.trim().is_empty() {
                anyhow::bail!("package_manager must not be empty");
            }
        }

        if self.install_args.is_empty() {
            anyhow::bail!("install_args must contain at least the install command");
        }

        let dir = self.dependency_dir.trim();
        if dir.is_empty() {
            anyhow::bail!("dependency_dir must be specified");
        }
        if dir.contains('/') || dir.contains('\\') || dir == "." || dir == ".." {
            anyhow::bail!("dependency_dir must be a plain directory name, got '{}'", dir);
        }

        if self.prune.names.iter().any(|n| n.trim().is_empty()) {
            anyhow::bail!("prune names must not be empty strings");
        }

        Ok(())
    }

    /// Generated files to delete for the given platform
    pub fn output_files(&self, platform: Platform) -> Vec<&str> {
        let extra = match platform {
            Platform::Windows => &self.cleanup.windows_files,
            Platform::Posix => &self.cleanup.posix_files,
        };
        self.cleanup
            .files
            .iter()
            .chain(extra.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn removal_wait(&self) -> Duration {
        Duration::from_millis(self.removal_wait_ms)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
