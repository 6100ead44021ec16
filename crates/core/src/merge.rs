//! Three-way merge resolution.
//!
//! The decision table is digest-based: a path's fate is fully determined by
//! its presence in, and content equality across, the current tree, the
//! branch tree, and their split-point tree. There is no line-level merging.
//! When both sides changed a path to different content, the resolution is a
//! synthesized conflict artifact carrying both versions.

use crate::digest::Digest;

/// How a merge invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The target tip is already an ancestor of the current tip; nothing to
    /// do.
    AlreadyAncestor,
    /// The current tip was an ancestor of the target: the current branch
    /// was advanced to the target tip with no merge commit.
    FastForwarded,
    /// A true three-way merge produced a new two-parent commit.
    Merged {
        commit: Digest,
        conflicted: bool,
    },
}

/// Per-path verdict of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathResolution {
    /// The path keeps the current side's version (possibly restoring the
    /// working file from it).
    KeepCurrent,
    /// The branch side's version wins; write it and record it in the tree.
    TakeBranch,
    /// The path ends up absent: drop it from the tree and the working tree.
    Delete,
    /// The path was already deleted on both interesting sides; nothing to
    /// write or record.
    LeaveAbsent,
    /// Both sides changed the path to different content: synthesize a
    /// conflict artifact.
    Conflict,
}

/// Classify one path by its digests in the three trees.
///
/// `current`/`split`/`branch` are the path's entries in the respective
/// trees, `None` meaning the path is absent there. Digest equality is the
/// only notion of "same content".
pub fn resolve_path(
    current: Option<&Digest>,
    split: Option<&Digest>,
    branch: Option<&Digest>,
) -> PathResolution {
    match (current, split, branch) {
        // Present everywhere: the classic three-way cases.
        (Some(c), Some(s), Some(b)) => {
            if c == s && b != s {
                PathResolution::TakeBranch
            } else if c != s && b == s {
                PathResolution::KeepCurrent
            } else if c == b {
                // Unchanged on both sides, or both sides converged on the
                // same content.
                PathResolution::KeepCurrent
            } else {
                PathResolution::Conflict
            }
        }

        // Deleted on both sides since the split.
        (None, Some(_), None) => PathResolution::LeaveAbsent,

        // Created on exactly one side since the split.
        (Some(_), None, None) => PathResolution::KeepCurrent,
        (None, None, Some(_)) => PathResolution::TakeBranch,

        // Branch deleted it; fine only if current left it untouched.
        (Some(c), Some(s), None) => {
            if c == s {
                PathResolution::Delete
            } else {
                PathResolution::Conflict
            }
        }

        // Current deleted it; fine only if the branch left it untouched.
        (None, Some(s), Some(b)) => {
            if s == b {
                PathResolution::Delete
            } else {
                PathResolution::Conflict
            }
        }

        // Both sides created it independently.
        (Some(c), None, Some(b)) => {
            if c == b {
                PathResolution::KeepCurrent
            } else {
                PathResolution::Conflict
            }
        }

        // A path never enters the decision table unless at least one tree
        // holds it.
        (None, None, None) => PathResolution::LeaveAbsent,
    }
}

/// Build the conflict artifact: current side first, then branch side, an
/// absent side contributing nothing between its markers. Sides are expected
/// to be newline-terminated text.
pub fn conflict_artifact(current: Option<&[u8]>, branch: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    if let Some(side) = current {
        out.extend_from_slice(side);
    }
    out.extend_from_slice(b"=======\n");
    if let Some(side) = branch {
        out.extend_from_slice(side);
    }
    out.extend_from_slice(b">>>>>>>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(content: &str) -> Digest {
        Digest::of_bytes(content.as_bytes())
    }

    #[test]
    fn test_only_branch_changed_takes_branch() {
        let base = d("base");
        let other = d("other");
        assert_eq!(
            resolve_path(Some(&base), Some(&base), Some(&other)),
            PathResolution::TakeBranch
        );
    }

    #[test]
    fn test_only_current_changed_keeps_current() {
        let base = d("base");
        let mine = d("mine");
        assert_eq!(
            resolve_path(Some(&mine), Some(&base), Some(&base)),
            PathResolution::KeepCurrent
        );
    }

    #[test]
    fn test_converged_change_keeps_current() {
        let base = d("base");
        let same = d("same");
        assert_eq!(
            resolve_path(Some(&same), Some(&base), Some(&same)),
            PathResolution::KeepCurrent
        );
    }

    #[test]
    fn test_divergent_change_conflicts() {
        let base = d("base");
        assert_eq!(
            resolve_path(Some(&d("x")), Some(&base), Some(&d("y"))),
            PathResolution::Conflict
        );
    }

    #[test]
    fn test_deleted_on_both_sides_stays_deleted() {
        let base = d("base");
        assert_eq!(
            resolve_path(None, Some(&base), None),
            PathResolution::LeaveAbsent
        );
    }

    #[test]
    fn test_one_sided_creations() {
        assert_eq!(
            resolve_path(Some(&d("new")), None, None),
            PathResolution::KeepCurrent
        );
        assert_eq!(
            resolve_path(None, None, Some(&d("new"))),
            PathResolution::TakeBranch
        );
    }

    #[test]
    fn test_branch_deleted_unmodified_file() {
        let base = d("base");
        assert_eq!(
            resolve_path(Some(&base), Some(&base), None),
            PathResolution::Delete
        );
    }

    #[test]
    fn test_edit_delete_conflicts() {
        let base = d("base");
        assert_eq!(
            resolve_path(Some(&d("edited")), Some(&base), None),
            PathResolution::Conflict
        );
        assert_eq!(
            resolve_path(None, Some(&base), Some(&d("edited"))),
            PathResolution::Conflict
        );
    }

    #[test]
    fn test_current_deleted_unmodified_file() {
        let base = d("base");
        assert_eq!(
            resolve_path(None, Some(&base), Some(&base)),
            PathResolution::Delete
        );
    }

    #[test]
    fn test_independent_same_creation_converges() {
        let same = d("same");
        assert_eq!(
            resolve_path(Some(&same), None, Some(&same)),
            PathResolution::KeepCurrent
        );
        assert_eq!(
            resolve_path(Some(&d("a")), None, Some(&d("b"))),
            PathResolution::Conflict
        );
    }

    #[test]
    fn test_conflict_artifact_shape() {
        let artifact = conflict_artifact(Some(b"mine\n"), Some(b"theirs\n"));
        assert_eq!(
            artifact,
            b"<<<<<<< HEAD\nmine\n=======\ntheirs\n>>>>>>>\n"
        );
    }

    #[test]
    fn test_conflict_artifact_with_absent_side() {
        let artifact = conflict_artifact(None, Some(b"theirs\n"));
        assert_eq!(artifact, b"<<<<<<< HEAD\n=======\ntheirs\n>>>>>>>\n");

        let artifact = conflict_artifact(Some(b"mine\n"), None);
        assert_eq!(artifact, b"<<<<<<< HEAD\nmine\n=======\n>>>>>>>\n");
    }
}
