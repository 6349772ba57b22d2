//! Platform capabilities.
//!
//! Everything that differs between operating systems is answered by a
//! [`Platform`] value passed in explicitly, so the algorithms themselves
//! never branch on `cfg!` and can be exercised for either platform in tests.

use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};

/// Target platform for a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    /// Short path limits, `npm.cmd` shim, `;`-separated PATH
    Windows,
    /// Everything else
    Posix,
}

impl Platform {
    /// The platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Posix }
    }

    /// Separator used between entries of the `PATH` variable
    pub fn path_list_separator(&self) -> char {
        match self {
            Self::Windows => ';',
            Self::Posix => ':',
        }
    }

    /// Default package-manager executable name
    pub fn package_manager_program(&self) -> &'static str {
        match self {
            Self::Windows => "npm.cmd",
            Self::Posix => "npm",
        }
    }

    /// Whether the default executable has to be located by searching `PATH`.
    ///
    /// `Command` on Windows does not resolve `.cmd` shims by itself.
    pub fn searches_path_for_program(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Whether nested dependency trees must be flattened after install
    pub fn flattens_dependencies(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

/// Search a `PATH`-style list for a regular file called `program`.
///
/// Entries are tried in order; a directory with the program's name does not
/// count. Empty entries are skipped.
pub fn find_program_location(
    program: &str,
    path_list: &str,
    platform: Platform,
) -> Option<PathBuf> {
    path_list
        .split(platform.path_list_separator())
        .filter(|entry| !entry.is_empty())
        .map(|entry| Path::new(entry).join(program))
        .find(|candidate| candidate.is_file())
}
