//! Rule dispatch.
//!
//! Rule names run in the order given. An unknown name stops the sequence
//! at that point; rules before it have already run.

use strum::{Display, EnumIter, EnumString};
use tracing::info;

use crate::builder::Builder;
use crate::error::{BuildError, Result};
use crate::package_manager::PackageInstaller;

/// A named procedure selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Rule {
    /// Clean, install, flatten (where needed) and prune
    #[strum(serialize = "build")]
    Build,
    /// Remove the dependency and generated data directories
    #[strum(serialize = "clean")]
    Clean,
    /// Prune the installed dependencies only
    #[strum(serialize = "npmClean")]
    NpmClean,
}

/// Rules run when none are named
pub const DEFAULT_RULES: &[Rule] = &[Rule::Build];

impl Rule {
    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| BuildError::UnrecognizedRule(name.to_string()))
    }

    /// Execute this rule against a builder
    pub fn run<I: PackageInstaller>(self, builder: &mut Builder<I>) -> Result<()> {
        info!("Running rule '{}'", self);
        match self {
            Rule::Build => builder.build(),
            Rule::Clean => builder.clean_dependencies().map(|_| ()),
            Rule::NpmClean => builder.prune().map(|_| ()),
        }
    }
}

/// Run each named rule in order, defaulting to [`DEFAULT_RULES`].
///
/// Returns the rules that ran.
pub fn run_rules<I, S>(builder: &mut Builder<I>, names: &[S]) -> Result<Vec<Rule>>
where
    I: PackageInstaller,
    S: AsRef<str>,
{
    let mut ran = Vec::new();

    if names.is_empty() {
        for rule in DEFAULT_RULES {
            rule.run(builder)?;
            ran.push(*rule);
        }
        return Ok(ran);
    }

    for name in names {
        let rule = Rule::parse(name.as_ref())?;
        rule.run(builder)?;
        ran.push(rule);
    }
    Ok(ran)
}
