//! End-to-end tests for the merge engine: preconditions, split points,
//! fast-forward handling, the per-file decision table and conflict
//! synthesis.
//!
//! The common fixture builds two branches that diverge from a shared base
//! commit, then merges the side branch back into the current one.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use trove_core::errors::{CoreError, RefError};
use trove_core::{Digest, MergeOutcome, Repository};

// ===========================================================================
// Helpers
// ===========================================================================

fn repo() -> (TempDir, Repository) {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    (dir, repo)
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

fn add_and_commit(repo: &Repository, dir: &Path, name: &str, content: &str, message: &str) -> Digest {
    write(dir, name, content);
    repo.add(name).unwrap();
    repo.commit(message).unwrap()
}

fn rm_and_commit(repo: &Repository, name: &str, message: &str) -> Digest {
    repo.remove(name).unwrap();
    repo.commit(message).unwrap()
}

/// Build: base commit with `f.txt = "base\n"` on master, a `side` branch,
/// then leave both branches checked out at the base. Returns the base id.
fn diverged_fixture(repo: &Repository, dir: &Path) -> Digest {
    let base = add_and_commit(repo, dir, "f.txt", "base\n", "base");
    repo.create_branch("side").unwrap();
    base
}

fn expect_merged(outcome: MergeOutcome, conflicted: bool) -> Digest {
    match outcome {
        MergeOutcome::Merged {
            commit,
            conflicted: c,
        } if c == conflicted => commit,
        other => panic!("expected Merged with conflicted={conflicted}, got {other:?}"),
    }
}

// ===========================================================================
// Preconditions
// ===========================================================================

#[test]
fn test_merge_with_staged_changes_fails_first() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    write(dir.path(), "pending.txt", "p\n");
    repo.add("pending.txt").unwrap();

    // Checked before branch existence: the bogus name is not reported.
    assert!(matches!(
        repo.merge("ghost"),
        Err(CoreError::UncommittedChanges)
    ));
}

#[test]
fn test_merge_with_unknown_branch_fails() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());
    assert!(matches!(
        repo.merge("ghost"),
        Err(CoreError::Ref(RefError::NoSuchBranch(_)))
    ));
}

#[test]
fn test_merge_branch_with_itself_fails() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());
    assert!(matches!(
        repo.merge("master"),
        Err(CoreError::SelfMerge(_))
    ));
}

#[test]
fn test_merge_blocked_by_untracked_obstruction() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    add_and_commit(&repo, dir.path(), "new.txt", "from side\n", "new on side");
    repo.checkout_branch("master").unwrap();

    // Untracked on master but present in side's tree.
    write(dir.path(), "new.txt", "local\n");
    assert!(matches!(
        repo.merge("side"),
        Err(CoreError::UntrackedObstruction(_))
    ));
    assert_eq!(read(dir.path(), "new.txt"), "local\n");
}

// ===========================================================================
// Trivial cases
// ===========================================================================

#[test]
fn test_merge_of_ancestor_is_a_no_op() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());
    add_and_commit(&repo, dir.path(), "f.txt", "ahead\n", "move master ahead");

    // side still points at the base: already part of master's history.
    let tip_before = repo.head().unwrap().0;
    assert_eq!(repo.merge("side").unwrap(), MergeOutcome::AlreadyAncestor);
    assert_eq!(repo.head().unwrap().0, tip_before);
}

#[test]
fn test_merge_of_descendant_fast_forwards() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    let side_tip = add_and_commit(&repo, dir.path(), "f.txt", "newer\n", "move side ahead");
    repo.checkout_branch("master").unwrap();

    assert_eq!(repo.merge("side").unwrap(), MergeOutcome::FastForwarded);
    // The current branch pointer moved; no merge commit was created.
    assert_eq!(repo.current_branch().unwrap(), "master");
    assert_eq!(repo.head().unwrap().0, side_tip);
    assert_eq!(read(dir.path(), "f.txt"), "newer\n");
}

// ===========================================================================
// Three-way decision table
// ===========================================================================

#[test]
fn test_branch_change_wins_when_current_is_unchanged() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    add_and_commit(&repo, dir.path(), "f.txt", "other\n", "edit on side");
    // Diverge master so the merge is not a fast-forward.
    repo.checkout_branch("master").unwrap();
    add_and_commit(&repo, dir.path(), "g.txt", "g\n", "unrelated on master");

    let merge_id = expect_merged(repo.merge("side").unwrap(), false);

    let merged = repo.graph().load(&merge_id).unwrap();
    assert_eq!(merged.tree["f.txt"], Digest::of_bytes(b"other\n"));
    assert_eq!(read(dir.path(), "f.txt"), "other\n");
}

#[test]
fn test_current_change_wins_when_branch_is_unchanged() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    add_and_commit(&repo, dir.path(), "g.txt", "g\n", "unrelated on side");
    repo.checkout_branch("master").unwrap();
    add_and_commit(&repo, dir.path(), "f.txt", "mine\n", "edit on master");

    let merge_id = expect_merged(repo.merge("side").unwrap(), false);

    let merged = repo.graph().load(&merge_id).unwrap();
    assert_eq!(merged.tree["f.txt"], Digest::of_bytes(b"mine\n"));
    // The unrelated side file arrived too.
    assert_eq!(read(dir.path(), "g.txt"), "g\n");
    assert_eq!(merged.tree["g.txt"], Digest::of_bytes(b"g\n"));
}

#[test]
fn test_branch_deletion_of_unmodified_file_applies() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    rm_and_commit(&repo, "f.txt", "drop f on side");
    repo.checkout_branch("master").unwrap();
    add_and_commit(&repo, dir.path(), "g.txt", "g\n", "unrelated on master");

    let merge_id = expect_merged(repo.merge("side").unwrap(), false);

    let merged = repo.graph().load(&merge_id).unwrap();
    assert!(!merged.tracks("f.txt"));
    assert!(!dir.path().join("f.txt").exists());
}

#[test]
fn test_merge_commit_has_both_parents() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    let side_tip = add_and_commit(&repo, dir.path(), "s.txt", "s\n", "side work");
    repo.checkout_branch("master").unwrap();
    let master_tip = add_and_commit(&repo, dir.path(), "m.txt", "m\n", "master work");

    let merge_id = expect_merged(repo.merge("side").unwrap(), false);

    let merged = repo.graph().load(&merge_id).unwrap();
    assert!(merged.is_merge());
    assert_eq!(merged.first_parent, Some(master_tip));
    assert_eq!(merged.second_parent, Some(side_tip));
    assert_eq!(merged.message, "Merged side into master.");

    // The merge commit is the new current tip; the log reports it as a
    // merge entry.
    assert_eq!(repo.head().unwrap().0, merge_id);
    let entries = repo.log().unwrap();
    assert!(entries[0].merge_parents.is_some());
}

// ===========================================================================
// Conflicts
// ===========================================================================

#[test]
fn test_divergent_edits_conflict_with_both_sides_in_artifact() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    add_and_commit(&repo, dir.path(), "f.txt", "y\n", "side edit");
    repo.checkout_branch("master").unwrap();
    add_and_commit(&repo, dir.path(), "f.txt", "x\n", "master edit");

    let merge_id = expect_merged(repo.merge("side").unwrap(), true);

    let artifact = read(dir.path(), "f.txt");
    assert_eq!(artifact, "<<<<<<< HEAD\nx\n=======\ny\n>>>>>>>\n");

    // The artifact itself is a stored blob recorded in the merge tree.
    let merged = repo.graph().load(&merge_id).unwrap();
    assert_eq!(
        merged.tree["f.txt"],
        Digest::of_bytes(artifact.as_bytes())
    );
}

#[test]
fn test_edit_versus_delete_conflicts() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    rm_and_commit(&repo, "f.txt", "drop f on side");
    repo.checkout_branch("master").unwrap();
    add_and_commit(&repo, dir.path(), "f.txt", "edited\n", "edit f on master");

    expect_merged(repo.merge("side").unwrap(), true);

    // Current side first, absent branch side contributes nothing.
    assert_eq!(
        read(dir.path(), "f.txt"),
        "<<<<<<< HEAD\nedited\n=======\n>>>>>>>\n"
    );
}

#[test]
fn test_merge_continues_past_a_conflict() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    write(dir.path(), "f.txt", "y\n");
    repo.add("f.txt").unwrap();
    write(dir.path(), "extra.txt", "extra\n");
    repo.add("extra.txt").unwrap();
    repo.commit("side edits").unwrap();

    repo.checkout_branch("master").unwrap();
    add_and_commit(&repo, dir.path(), "f.txt", "x\n", "master edit");

    let merge_id = expect_merged(repo.merge("side").unwrap(), true);

    // The conflicted path carries markers while the clean path merged in.
    assert!(read(dir.path(), "f.txt").contains("======="));
    assert_eq!(read(dir.path(), "extra.txt"), "extra\n");

    let merged = repo.graph().load(&merge_id).unwrap();
    assert!(merged.tracks("extra.txt"));
}

// ===========================================================================
// Merges feeding later split points
// ===========================================================================

#[test]
fn test_split_point_after_a_merge_uses_second_parent_edge() {
    let (dir, repo) = repo();
    diverged_fixture(&repo, dir.path());

    repo.checkout_branch("side").unwrap();
    let side_tip = add_and_commit(&repo, dir.path(), "s.txt", "s\n", "side work");
    repo.checkout_branch("master").unwrap();
    add_and_commit(&repo, dir.path(), "m.txt", "m\n", "master work");
    expect_merged(repo.merge("side").unwrap(), false);

    // side is now an ancestor of master through the merge's second parent.
    let (master_tip, _) = repo.head().unwrap();
    let split = repo
        .graph()
        .split_point(&master_tip, &side_tip)
        .unwrap();
    assert_eq!(split, side_tip);
    assert_eq!(repo.merge("side").unwrap(), MergeOutcome::AlreadyAncestor);
}
