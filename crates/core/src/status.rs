//! Working-tree status computation.
//!
//! The report is derived from read-only snapshots of four path sets (the
//! working tree, the staged adds, the staged removals, and the tracked
//! tree) combined with set operations computed up front. Nothing is
//! mutated while classifying, and digest equality is the only content
//! comparison.

use std::collections::{BTreeMap, BTreeSet};

use crate::digest::Digest;

/// Why a tracked or staged file counts as "modification not staged".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModificationKind {
    /// Working content differs from the staged/tracked digest.
    Modified,
    /// The working file is gone.
    Deleted,
}

/// Snapshot report of the repository's pending state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// All branch names, sorted.
    pub branches: Vec<String>,
    pub current_branch: String,
    /// Paths staged for add whose working content still matches.
    pub staged: Vec<String>,
    /// Paths staged for removal and absent from the working tree.
    pub removed: Vec<String>,
    /// Tracked or staged paths whose working state diverged, sorted by path.
    pub modified: Vec<(String, ModificationKind)>,
    /// Working files that are neither staged nor tracked (or that carry a
    /// staged-removal marker while present again).
    pub untracked: Vec<String>,
}

/// Classify every path from the given snapshots.
///
/// `working` and `staged_add` map paths to their content digests; `tracked`
/// is the current commit's tree.
pub fn compute(
    branches: Vec<String>,
    current_branch: String,
    working: &BTreeMap<String, Digest>,
    staged_add: &BTreeMap<String, Digest>,
    staged_remove: &BTreeSet<String>,
    tracked: &BTreeMap<String, Digest>,
) -> StatusReport {
    let working_paths: BTreeSet<&String> = working.keys().collect();
    let add_paths: BTreeSet<&String> = staged_add.keys().collect();
    let tracked_paths: BTreeSet<&String> = tracked.keys().collect();

    let mut staged = Vec::new();
    let mut modified = Vec::new();

    for (path, staged_digest) in staged_add {
        match working.get(path) {
            Some(digest) if digest == staged_digest => staged.push(path.clone()),
            Some(_) => modified.push((path.clone(), ModificationKind::Modified)),
            None => modified.push((path.clone(), ModificationKind::Deleted)),
        }
    }

    let removed: Vec<String> = staged_remove
        .iter()
        .filter(|path| !working_paths.contains(path))
        .cloned()
        .collect();

    for (path, tracked_digest) in tracked {
        if add_paths.contains(path) || staged_remove.contains(path.as_str()) {
            continue;
        }
        match working.get(path) {
            Some(digest) if digest == tracked_digest => {}
            Some(_) => modified.push((path.clone(), ModificationKind::Modified)),
            None => modified.push((path.clone(), ModificationKind::Deleted)),
        }
    }
    modified.sort();

    let untracked: Vec<String> = working_paths
        .difference(&add_paths)
        .filter(|path| {
            staged_remove.contains(path.as_str()) || !tracked_paths.contains(*path)
        })
        .map(|path| (*path).clone())
        .collect();

    StatusReport {
        branches,
        current_branch,
        staged,
        removed,
        modified,
        untracked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(content: &str) -> Digest {
        Digest::of_bytes(content.as_bytes())
    }

    fn report(
        working: &[(&str, &str)],
        staged_add: &[(&str, &str)],
        staged_remove: &[&str],
        tracked: &[(&str, &str)],
    ) -> StatusReport {
        let to_map = |entries: &[(&str, &str)]| {
            entries
                .iter()
                .map(|(p, c)| (p.to_string(), digest(c)))
                .collect::<BTreeMap<_, _>>()
        };
        compute(
            vec!["master".into()],
            "master".into(),
            &to_map(working),
            &to_map(staged_add),
            &staged_remove.iter().map(|p| p.to_string()).collect(),
            &to_map(tracked),
        )
    }

    #[test]
    fn test_clean_tree_is_all_empty() {
        let r = report(&[("a.txt", "a")], &[], &[], &[("a.txt", "a")]);
        assert!(r.staged.is_empty());
        assert!(r.removed.is_empty());
        assert!(r.modified.is_empty());
        assert!(r.untracked.is_empty());
    }

    #[test]
    fn test_staged_vs_modified_after_staging() {
        let r = report(
            &[("a.txt", "a"), ("b.txt", "b2")],
            &[("a.txt", "a"), ("b.txt", "b")],
            &[],
            &[],
        );
        assert_eq!(r.staged, vec!["a.txt".to_string()]);
        assert_eq!(
            r.modified,
            vec![("b.txt".to_string(), ModificationKind::Modified)]
        );
    }

    #[test]
    fn test_removed_and_recreated_untracked() {
        // x.txt staged for removal and absent: removed. y.txt staged for
        // removal but present again: untracked.
        let r = report(
            &[("y.txt", "y")],
            &[],
            &["x.txt", "y.txt"],
            &[("x.txt", "x"), ("y.txt", "y")],
        );
        assert_eq!(r.removed, vec!["x.txt".to_string()]);
        assert_eq!(r.untracked, vec!["y.txt".to_string()]);
        assert!(r.modified.is_empty());
    }

    #[test]
    fn test_tracked_edits_and_deletions() {
        let r = report(
            &[("a.txt", "changed")],
            &[],
            &[],
            &[("a.txt", "a"), ("gone.txt", "g")],
        );
        assert_eq!(
            r.modified,
            vec![
                ("a.txt".to_string(), ModificationKind::Modified),
                ("gone.txt".to_string(), ModificationKind::Deleted),
            ]
        );
    }

    #[test]
    fn test_staged_then_deleted_from_working() {
        let r = report(&[], &[("a.txt", "a")], &[], &[]);
        assert_eq!(
            r.modified,
            vec![("a.txt".to_string(), ModificationKind::Deleted)]
        );
    }

    #[test]
    fn test_plain_untracked_file() {
        let r = report(&[("new.txt", "n")], &[], &[], &[]);
        assert_eq!(r.untracked, vec!["new.txt".to_string()]);
    }
}
