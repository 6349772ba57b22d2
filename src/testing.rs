//! Test doubles shared by unit tests.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::package_manager::{InstallStatus, PackageInstaller};

/// Records every call and, on a full install, creates a directory layout
/// under the project root the way `npm install` would.
#[derive(Debug, Default)]
pub struct FakeInstaller {
    pub calls: Vec<Vec<String>>,
    creates: Vec<String>,
    exit_code: i32,
    failing_spec: Option<(String, i32)>,
}

impl FakeInstaller {
    pub fn creating(dirs: &[&str]) -> Self {
        Self {
            creates: dirs.iter().map(|d| (*d).to_string()).collect(),
            ..Default::default()
        }
    }

    /// Full installs exit with `code`
    pub fn exiting_with(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Installing exactly `spec` exits with `code`
    pub fn failing_on(mut self, spec: &str, code: i32) -> Self {
        self.failing_spec = Some((spec.to_string(), code));
        self
    }
}

impl PackageInstaller for FakeInstaller {
    fn install(&mut self, root: &Path, packages: &[String]) -> Result<InstallStatus> {
        self.calls.push(packages.to_vec());

        if packages.is_empty() {
            for dir in &self.creates {
                fs::create_dir_all(root.join(dir))?;
            }
            return Ok(match self.exit_code {
                0 => InstallStatus::ok(),
                code => InstallStatus::failed(code),
            });
        }

        match &self.failing_spec {
            Some((spec, code)) if packages.contains(spec) => Ok(InstallStatus::failed(*code)),
            _ => Ok(InstallStatus::ok()),
        }
    }
}
