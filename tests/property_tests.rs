//! Property-based tests for nodeprep
//!
//! These tests verify:
//! - Flattening reaches a fixed point for arbitrary nested trees
//! - Top-level packages always survive flattening untouched
//! - Name-mode pruning never selects a package root
//! - Only the three rule names parse

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use nodeprep::config::{MatchMode, PruneConfig};
use nodeprep::{Rule, flatten_dependencies, prune_reason};

// =============================================================================
// Flatten
// =============================================================================

/// A chain of package names: `[a, b]` is `node_modules/a/node_modules/b`
fn nesting_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    let name = prop_oneof![
        Just("a".to_string()),
        Just("b".to_string()),
        Just("c".to_string()),
        Just("d".to_string()),
        Just("e".to_string()),
    ];
    prop::collection::vec(prop::collection::vec(name, 1..5), 1..8)
}

fn package_path(top: &Path, chain: &[String]) -> PathBuf {
    let mut path = top.to_path_buf();
    for (i, name) in chain.iter().enumerate() {
        if i > 0 {
            path.push("node_modules");
        }
        path.push(name);
    }
    path
}

/// Build the tree, writing each package's chain into an `origin` file
fn build_tree(top: &Path, chains: &[Vec<String>]) {
    for chain in chains {
        for depth in 1..=chain.len() {
            let dir = package_path(top, &chain[..depth]);
            fs::create_dir_all(&dir).unwrap();
            let origin = dir.join("origin");
            if !origin.exists() {
                fs::write(origin, chain[..depth].join("/")).unwrap();
            }
        }
    }
}

fn top_level(top: &Path) -> BTreeSet<String> {
    fs::read_dir(top)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Flatten: a second run finds nothing left to move
    #[test]
    fn flatten_reaches_fixed_point(chains in nesting_strategy()) {
        let root = TempDir::new().unwrap();
        let top = root.path().join("node_modules");
        build_tree(&top, &chains);

        flatten_dependencies(&top, "node_modules", false).unwrap();
        let again = flatten_dependencies(&top, "node_modules", false).unwrap();

        prop_assert!(again.moved.is_empty());
    }

    /// Flatten: packages already at the top level are never replaced
    #[test]
    fn flatten_keeps_top_level_packages(chains in nesting_strategy()) {
        let root = TempDir::new().unwrap();
        let top = root.path().join("node_modules");
        build_tree(&top, &chains);

        let before = top_level(&top);
        let origins: Vec<(String, String)> = before
            .iter()
            .map(|name| (name.clone(), fs::read_to_string(top.join(name).join("origin")).unwrap()))
            .collect();

        let report = flatten_dependencies(&top, "node_modules", false).unwrap();

        let after = top_level(&top);
        prop_assert!(before.is_subset(&after));
        for (name, origin) in origins {
            prop_assert_eq!(fs::read_to_string(top.join(&name).join("origin")).unwrap(), origin);
        }
        // each move claims a distinct new name
        let moved: BTreeSet<String> = report.moved.iter().map(|p| p.to_string()).collect();
        prop_assert_eq!(moved.len(), report.moved.len());
        prop_assert!(moved.is_disjoint(&before));
    }

    /// Flatten: a dry run predicts exactly what a real run moves
    #[test]
    fn flatten_dry_run_matches_real_run(chains in nesting_strategy()) {
        let root = TempDir::new().unwrap();
        let top = root.path().join("node_modules");
        build_tree(&top, &chains);

        let predicted = flatten_dependencies(&top, "node_modules", true).unwrap();
        let actual = flatten_dependencies(&top, "node_modules", false).unwrap();

        let predicted: BTreeSet<String> = predicted.moved.iter().map(|p| p.to_string()).collect();
        let actual: BTreeSet<String> = actual.moved.iter().map(|p| p.to_string()).collect();
        prop_assert_eq!(predicted, actual);
    }
}

// =============================================================================
// Prune
// =============================================================================

proptest! {
    /// Name mode: a direct child of node_modules is a package and is kept
    #[test]
    fn name_mode_never_prunes_package_roots(name in "[a-z_@.-]{1,12}") {
        let prune = PruneConfig::default();
        let rel = format!("node_modules/{name}");
        prop_assert_eq!(prune_reason(Path::new(&rel), "node_modules", &prune), None);

        let nested = format!("node_modules/foo/node_modules/{name}");
        prop_assert_eq!(prune_reason(Path::new(&nested), "node_modules", &prune), None);
    }

    /// Nothing outside a dependency directory is ever pruned
    #[test]
    fn project_directories_are_never_pruned(
        dirs in prop::collection::vec("(test|src|tools|example|lib|Release|obj)", 1..5),
        substring in any::<bool>(),
    ) {
        let prune = PruneConfig {
            match_mode: if substring { MatchMode::Substring } else { MatchMode::Name },
            ..Default::default()
        };
        let rel = dirs.join("/");
        prop_assert_eq!(prune_reason(Path::new(&rel), "node_modules", &prune), None);
    }
}

// =============================================================================
// Rules
// =============================================================================

proptest! {
    /// Only the exact rule names parse
    #[test]
    fn unknown_rule_names_are_rejected(name in "[A-Za-z]{0,10}") {
        let known = ["build", "clean", "npmClean"];
        let parsed = Rule::parse(&name);
        prop_assert_eq!(parsed.is_ok(), known.contains(&name.as_str()));
    }
}
