//! Prune non-runtime subtrees out of installed dependencies.
//!
//! Packages ship tests, examples, sources and build intermediates that are
//! never loaded at runtime and push installer paths over length limits.
//! Every directory below a dependency directory is checked against the
//! configured prune names and the `Release/obj` intermediate rule.

use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::cleanup::{RemovalOutcome, RemoveOptions, try_remove_dir};
use crate::config::{BuildConfig, MatchMode, PruneConfig};
use crate::error::Result;

/// Directories removed (or, in a dry run, selected) by a prune run
#[derive(Debug, Default)]
pub struct PruneReport {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Decide whether the directory at `rel` (relative to the project root)
/// should be pruned, returning the rule that matched.
pub fn prune_reason(rel: &Path, dependency_dir: &str, prune: &PruneConfig) -> Option<String> {
    let components: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let first_dep = components.iter().position(|c| c == dependency_dir)?;
    let (name, parents) = components.split_last()?;

    if name == "obj" && parents.last().is_some_and(|p| p == "Release") {
        return Some("obj".to_string());
    }

    match prune.match_mode {
        MatchMode::Substring => {
            let full = components.join("/");
            prune
                .names
                .iter()
                .find(|pattern| full.contains(pattern.as_str()))
                .cloned()
        }
        MatchMode::Name => {
            if components.len() <= first_dep + 1 || is_package_root(&components, dependency_dir) {
                return None;
            }
            let trimmed = name.trim_matches('_');
            prune
                .names
                .iter()
                .find(|pattern| trimmed.starts_with(pattern.as_str()))
                .cloned()
        }
    }
}

/// A package directory, or the `@scope` directory holding packages
fn is_package_root(components: &[String], dependency_dir: &str) -> bool {
    let n = components.len();
    let parent = n.checked_sub(2).map(|i| components[i].as_str());
    let grandparent = n.checked_sub(3).map(|i| components[i].as_str());

    if parent == Some(dependency_dir) {
        return true;
    }
    matches!(parent, Some(p) if p.starts_with('@')) && grandparent == Some(dependency_dir)
}

/// Walk the tree under `root` and delete every directory selected by
/// [`prune_reason`]. Deleted directories are not descended into. Failures
/// are reported and the walk continues.
pub fn prune_dependencies(
    root: &Path,
    config: &BuildConfig,
    opts: RemoveOptions,
) -> Result<PruneReport> {
    info!("Pruning dependency directories under {}", root.display());
    let mut report = PruneReport::default();

    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(path);
        let Some(reason) = prune_reason(rel, &config.dependency_dir, &config.prune) else {
            continue;
        };

        walker.skip_current_dir();
        info!("\tDELETING ({}): {}", reason, path.display());
        match try_remove_dir(path, false, opts)? {
            RemovalOutcome::Removed | RemovalOutcome::Skipped => {
                report.deleted.push(path.to_path_buf())
            }
            RemovalOutcome::Failed(reason) => report.failed.push((path.to_path_buf(), reason)),
            RemovalOutcome::Missing => {}
        }
    }

    info!("Pruned {} directories", report.deleted.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn opts() -> RemoveOptions {
        RemoveOptions {
            dry_run: false,
            wait: Duration::from_secs(1),
        }
    }

    fn reason(rel: &str, mode: MatchMode) -> Option<String> {
        let prune = PruneConfig {
            match_mode: mode,
            ..Default::default()
        };
        prune_reason(Path::new(rel), "node_modules", &prune)
    }

    #[test]
    fn test_name_mode_matches() {
        assert_eq!(reason("node_modules/foo/test", MatchMode::Name).as_deref(), Some("test"));
        assert_eq!(reason("node_modules/foo/tests", MatchMode::Name).as_deref(), Some("test"));
        assert_eq!(reason("node_modules/foo/__tests__", MatchMode::Name).as_deref(), Some("test"));
        assert_eq!(
            reason("node_modules/foo/examples", MatchMode::Name).as_deref(),
            Some("example")
        );
        assert_eq!(reason("node_modules/foo/src", MatchMode::Name).as_deref(), Some("src"));
        assert_eq!(
            reason("node_modules/@scope/foo/tools", MatchMode::Name).as_deref(),
            Some("tools")
        );
        assert_eq!(reason("node_modules/foo/lib", MatchMode::Name), None);
    }

    #[test]
    fn test_name_mode_spares_package_roots() {
        assert_eq!(reason("node_modules/tools", MatchMode::Name), None);
        assert_eq!(reason("node_modules/latest", MatchMode::Name), None);
        assert_eq!(reason("node_modules/@test", MatchMode::Name), None);
        assert_eq!(reason("node_modules/@scope/testing", MatchMode::Name), None);
        assert_eq!(reason("node_modules/a/node_modules/test", MatchMode::Name), None);
        assert_eq!(reason("node_modules/foo/lib/latest", MatchMode::Name), None);
    }

    #[test]
    fn test_substring_mode_matches_anywhere() {
        assert_eq!(reason("node_modules/latest", MatchMode::Substring).as_deref(), Some("test"));
        assert_eq!(reason("node_modules/tools", MatchMode::Substring).as_deref(), Some("tools"));
        assert_eq!(reason("node_modules/foo/lib", MatchMode::Substring), None);
    }

    #[test]
    fn test_only_dependency_trees_are_pruned() {
        assert_eq!(reason("test", MatchMode::Name), None);
        assert_eq!(reason("src/app", MatchMode::Substring), None);
        assert_eq!(reason("build/Release/obj", MatchMode::Name), None);
        assert_eq!(
            reason("node_modules/serialport/build/Release/obj", MatchMode::Name).as_deref(),
            Some("obj")
        );
        assert_eq!(reason("node_modules/serialport/build/Debug/obj", MatchMode::Name), None);
    }

    #[test]
    fn test_prune_tree() {
        let root = TempDir::new().unwrap();
        let r = root.path();
        for dir in [
            "node_modules/foo/test/fixtures",
            "node_modules/foo/lib",
            "node_modules/foo/example",
            "node_modules/tools/lib",
            "node_modules/serialport/build/Release/obj/gen",
            "node_modules/serialport/build/Release/bindings",
            "src/app",
            "test",
        ] {
            fs::create_dir_all(r.join(dir)).unwrap();
        }
        fs::write(r.join("node_modules/foo/test.js"), "").unwrap();

        let report = prune_dependencies(r, &BuildConfig::default(), opts()).unwrap();

        assert!(!r.join("node_modules/foo/test").exists());
        assert!(!r.join("node_modules/foo/example").exists());
        assert!(!r.join("node_modules/serialport/build/Release/obj").exists());
        assert!(r.join("node_modules/foo/lib").exists());
        assert!(r.join("node_modules/foo/test.js").exists());
        assert!(r.join("node_modules/tools/lib").exists());
        assert!(r.join("node_modules/serialport/build/Release/bindings").exists());
        assert!(r.join("src/app").exists());
        assert!(r.join("test").exists());
        assert_eq!(report.deleted.len(), 3);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_prune_dry_run_keeps_tree() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("node_modules/foo/test")).unwrap();
        let dry = RemoveOptions {
            dry_run: true,
            ..opts()
        };

        let report = prune_dependencies(root.path(), &BuildConfig::default(), dry).unwrap();

        assert_eq!(report.deleted, vec![root.path().join("node_modules/foo/test")]);
        assert!(root.path().join("node_modules/foo/test").exists());
    }
}
