//! Error handling module for nodeprep
//!
//! Only fatal conditions are represented here. Non-fatal filesystem failures
//! are reported through [`crate::cleanup::RemovalOutcome`] and never abort a rule.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop the rule sequence
#[derive(Error, Debug)]
pub enum BuildError {
    /// A rule name that the dispatcher does not know
    #[error("Unrecognized rule '{0}'")]
    UnrecognizedRule(String),

    /// The package manager exited with a non-zero status
    #[error("package manager install failed, rc {code}")]
    InstallFailed { code: i32 },

    /// The package manager executable could not be located
    #[error("package manager not found: {program} is not on PATH")]
    PackageManagerNotFound { program: String },

    /// The package manager could not be started at all
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A directory marked as required-to-remove could not be removed
    #[error("Build failed because it cannot remove {}: {reason}", path.display())]
    ForcedRemoval { path: PathBuf, reason: String },

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors outside of the reported-and-continue removal paths
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for nodeprep operations
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// An install failure propagates the package manager's own code; every
    /// other fatal error exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InstallFailed { code } => *code,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BuildError::UnrecognizedRule("deploy".to_string());
        assert_eq!(err.to_string(), "Unrecognized rule 'deploy'");

        let err = BuildError::InstallFailed { code: 7 };
        assert_eq!(err.to_string(), "package manager install failed, rc 7");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BuildError::InstallFailed { code: 42 }.exit_code(), 42);
        assert_eq!(BuildError::UnrecognizedRule("x".into()).exit_code(), 1);
        assert_eq!(BuildError::config("bad").exit_code(), 1);
        let forced = BuildError::ForcedRemoval {
            path: PathBuf::from("node_modules"),
            reason: "busy".into(),
        };
        assert_eq!(forced.exit_code(), 1);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BuildError = io_err.into();
        assert!(matches!(err, BuildError::Io(_)));
    }
}
