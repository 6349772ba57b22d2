use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use std::path::PathBuf;

use crate::platform::Platform;

/// nodeprep - install, flatten and prune node_modules before packaging
#[derive(Parser, Debug)]
#[command(name = "nodeprep")]
#[command(about = "Install production dependencies and strip node_modules down for packaging")]
#[command(version)]
pub struct Cli {
    /// Rules to run in order: build, clean, npmClean (default: build)
    ///
    /// Rule names are checked when they run, so an unknown name after a
    /// valid one still lets the earlier rule finish. Names starting with `-`
    /// are accepted here too; options must come before the first rule.
    #[arg(allow_hyphen_values = true)]
    pub rules: Vec<String>,

    /// Project root containing package.json
    #[arg(short = 'C', long, default_value = ".")]
    pub root: PathBuf,

    /// JSON config file (default: <root>/nodeprep.json when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Platform whose layout rules apply
    #[arg(long, value_enum, default_value_t = PlatformArg::Auto)]
    pub platform: PlatformArg,

    /// Dry-run mode: report deletions and moves without changing anything.
    ///
    /// The package manager is not run in this mode.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformArg {
    /// The platform nodeprep was built for
    Auto,
    Windows,
    Posix,
}

impl PlatformArg {
    pub fn resolve(self) -> Platform {
        match self {
            Self::Auto => Platform::current(),
            Self::Windows => Platform::Windows,
            Self::Posix => Platform::Posix,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        let cli = <Self as clap::Parser>::parse();
        if let Err(e) = cli.check_option_order() {
            e.exit();
        }
        cli
    }

    /// Reject a known option given after a rule.
    ///
    /// Once a rule is seen, every later argument is taken as a rule name, so
    /// `clean --dry-run` would otherwise run `clean` for real before failing
    /// on `--dry-run`.
    pub fn check_option_order(&self) -> Result<(), clap::Error> {
        let mut cmd = Self::command();
        cmd.build();

        for rule in &self.rules {
            let flag = rule.split('=').next().unwrap_or(rule);
            let known = if let Some(long) = flag.strip_prefix("--") {
                cmd.get_arguments().any(|a| a.get_long() == Some(long))
            } else if let Some(short) = flag.strip_prefix('-').and_then(|s| s.chars().next()) {
                cmd.get_arguments().any(|a| a.get_short() == Some(short))
            } else {
                false
            };

            if known {
                return Err(cmd.error(
                    ErrorKind::ArgumentConflict,
                    format!("option '{}' must come before the rules", flag),
                ));
            }
        }
        Ok(())
    }
}
