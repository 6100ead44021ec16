//! Error types for the Trove core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type. Operation-level precondition failures (nothing to
//! commit, self-merge, and so on) live directly on [`CoreError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::digest::Digest;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
///
/// Every variant except [`StoreError::Corrupt`] (surfaced through `Store`)
/// is a user-facing, recoverable-by-the-user condition: the command prints
/// one diagnostic and terminates without touching persisted state.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Ref(#[from] RefError),

    #[error(transparent)]
    Worktree(#[from] WorktreeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `init` inside an already-initialized repository.
    #[error("a repository already exists at '{}'", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Any command other than `init` outside a repository.
    #[error("no repository found at '{}'", .0.display())]
    NotInitialized(PathBuf),

    /// `rm` on a path neither tracked nor staged for add.
    #[error("no reason to remove '{0}'")]
    NoReasonToRemove(String),

    /// `commit` with an empty staging area.
    #[error("nothing staged to commit")]
    NothingToCommit,

    /// `commit` with an empty message.
    #[error("empty commit message")]
    EmptyMessage,

    /// `checkout` of the branch that is already current.
    #[error("branch '{0}' is already checked out")]
    AlreadyCurrent(String),

    /// `merge` with a non-empty staging area.
    #[error("staging area is not empty")]
    UncommittedChanges,

    /// `merge` of a branch into itself.
    #[error("cannot merge branch '{0}' with itself")]
    SelfMerge(String),

    /// An untracked working file collides with an incoming change.
    #[error("untracked file '{0}' would be overwritten")]
    UntrackedObstruction(String),

    /// `find` matched no commit.
    #[error("no commit found with message '{0}'")]
    NoSuchCommitMessage(String),

    /// File restore from a commit whose tree lacks the path.
    #[error("path '{0}' does not exist in that commit")]
    PathNotInCommit(String),
}

// ---------------------------------------------------------------------------
// Object store errors
// ---------------------------------------------------------------------------

/// Errors from the content-addressable object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No object with this digest exists. A valid state for callers that
    /// probe optional references.
    #[error("object not found: {0}")]
    NotFound(Digest),

    /// A digest-named object whose content does not hash back to its key.
    /// Fatal: never mapped to a user-facing diagnostic.
    #[error("corrupt object: content of '{0}' does not match its digest")]
    Corrupt(Digest),

    /// Commit (de)serialization failure while writing.
    #[error("commit serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Generic I/O wrapper.
    #[error("object store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Commit graph errors
// ---------------------------------------------------------------------------

/// Errors from commit lookup and ancestry traversal.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No stored commit's digest equals or starts with the given id.
    #[error("no commit with id '{0}'")]
    CommitNotFound(String),

    /// Two tips share no reachable commit. Cannot happen for histories
    /// grown from a single root; indicates a damaged store.
    #[error("commits '{0}' and '{1}' have no common ancestor")]
    NoCommonAncestor(Digest, Digest),

    /// Underlying store error during traversal.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Staging area errors
// ---------------------------------------------------------------------------

/// Errors from the staging area.
#[derive(Debug, Error)]
pub enum StageError {
    /// The path has no staged-add entry.
    #[error("path not staged: '{0}'")]
    NotStaged(String),

    /// Generic I/O wrapper.
    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Reference store errors
// ---------------------------------------------------------------------------

/// Errors from the branch reference store.
#[derive(Debug, Error)]
pub enum RefError {
    /// The named branch does not exist.
    #[error("no branch named '{0}'")]
    NoSuchBranch(String),

    /// `branch` with a name that already exists.
    #[error("branch '{0}' already exists")]
    BranchExists(String),

    /// Attempt to delete the current branch.
    #[error("cannot remove the current branch '{0}'")]
    CurrentBranch(String),

    /// A branch file whose content is not a digest.
    #[error("branch '{0}' does not hold a valid commit digest")]
    InvalidDigest(String),

    /// Generic I/O wrapper.
    #[error("reference store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Working tree errors
// ---------------------------------------------------------------------------

/// Errors from the working-tree boundary.
#[derive(Debug, Error)]
pub enum WorktreeError {
    /// The named working file does not exist (or is not a plain file).
    #[error("working file not found: '{0}'")]
    FileNotFound(String),

    /// Generic I/O wrapper.
    #[error("working tree I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from repository configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    Parse(String),

    /// TOML serialization error when writing defaults.
    #[error("configuration serialize error: {0}")]
    Serialize(String),

    /// Generic I/O wrapper.
    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}
