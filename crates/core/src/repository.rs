//! The repository handle.
//!
//! An explicit context value wiring together the object store, staging
//! area, reference store, working tree, and configuration for one
//! repository rooted at one directory. Every operation takes `&self`, so
//! multiple independent repositories can coexist in a single process.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use crate::commit::Commit;
use crate::config::RepoConfig;
use crate::digest::Digest;
use crate::errors::{CoreError, RefError};
use crate::graph::CommitGraph;
use crate::merge::{self, MergeOutcome, PathResolution};
use crate::refs::RefStore;
use crate::stage::StagingArea;
use crate::status::{self, StatusReport};
use crate::store::ObjectStore;
use crate::worktree::Worktree;

/// Name of the repository data directory.
pub const REPO_DIR: &str = ".trove";

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";
const STAGE_DIR: &str = "stage";
const CONFIG_FILE: &str = "config.toml";

/// One entry of a history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: Digest,
    /// Both parents, present only for merge commits.
    pub merge_parents: Option<(Digest, Digest)>,
    /// Whole Unix seconds.
    pub timestamp: i64,
    pub message: String,
}

/// Handle over one repository and its working directory.
pub struct Repository {
    worktree: Worktree,
    store: ObjectStore,
    stage: StagingArea,
    refs: RefStore,
    config: RepoConfig,
    dir: PathBuf,
}

impl Repository {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Whether `root` holds an initialized repository.
    pub fn is_initialized(root: impl AsRef<Path>) -> bool {
        root.as_ref().join(REPO_DIR).is_dir()
    }

    /// Initialize a new repository at `root` with the default
    /// configuration.
    pub fn init(root: impl AsRef<Path>) -> Result<Self, CoreError> {
        Self::init_with(root, RepoConfig::default())
    }

    /// Initialize a new repository at `root`.
    ///
    /// Creates the data layout, writes `config`, persists the root commit
    /// (empty tree, no parents, epoch timestamp, so identical across fresh
    /// repositories) and points the configured default branch at it.
    pub fn init_with(root: impl AsRef<Path>, config: RepoConfig) -> Result<Self, CoreError> {
        let root = root.as_ref();
        if Self::is_initialized(root) {
            return Err(CoreError::AlreadyInitialized(root.join(REPO_DIR)));
        }
        let dir = root.join(REPO_DIR);
        fs::create_dir_all(&dir).map_err(crate::errors::StoreError::from)?;

        let store = ObjectStore::init(dir.join(OBJECTS_DIR))?;
        let stage = StagingArea::init(dir.join(STAGE_DIR))?;

        let root_id = store.put_commit(&Commit::root())?;
        let refs = RefStore::init(dir.join(REFS_DIR), &config.repo.default_branch, &root_id)?;
        config.save(&dir.join(CONFIG_FILE))?;

        info!(root = %root.display(), branch = %config.repo.default_branch, "repository initialized");
        Ok(Self {
            worktree: Worktree::new(root),
            store,
            stage,
            refs,
            config,
            dir,
        })
    }

    /// Open an existing repository at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, CoreError> {
        let root = root.as_ref();
        if !Self::is_initialized(root) {
            return Err(CoreError::NotInitialized(root.to_path_buf()));
        }
        let dir = root.join(REPO_DIR);
        let config = RepoConfig::load(&dir.join(CONFIG_FILE))?;
        Ok(Self {
            worktree: Worktree::new(root),
            store: ObjectStore::open(dir.join(OBJECTS_DIR)),
            stage: StagingArea::open(dir.join(STAGE_DIR)),
            refs: RefStore::open(dir.join(REFS_DIR)),
            config,
            dir,
        })
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Traversal facade over this repository's commits.
    pub fn graph(&self) -> CommitGraph<'_> {
        CommitGraph::new(&self.store)
    }

    fn current_commit(&self) -> Result<(Digest, Commit), CoreError> {
        let tip = self.refs.current_tip()?;
        let commit = self.graph().load(&tip)?;
        Ok((tip, commit))
    }

    /// Name of the current branch.
    pub fn current_branch(&self) -> Result<String, CoreError> {
        Ok(self.refs.current_branch()?)
    }

    /// Digest and commit at the current branch tip.
    pub fn head(&self) -> Result<(Digest, Commit), CoreError> {
        self.current_commit()
    }

    /// Digest a named branch points at.
    pub fn branch_tip(&self, name: &str) -> Result<Digest, CoreError> {
        Ok(self.refs.read_branch(name)?)
    }

    // -----------------------------------------------------------------------
    // Staging operations
    // -----------------------------------------------------------------------

    /// Stage a working file for the next commit.
    ///
    /// If the working content hashes to the digest already tracked for the
    /// path, the path is un-staged entirely: there is nothing to change.
    pub fn add(&self, path: &str) -> Result<(), CoreError> {
        let content = self.worktree.read(path)?;
        let (_, head) = self.current_commit()?;

        if head.tree.get(path) == Some(&Digest::of_bytes(&content)) {
            self.stage.unstage(path)?;
            debug!(path, "working content matches tracked digest, un-staged");
            return Ok(());
        }
        self.stage.stage_add(path, &content)?;
        Ok(())
    }

    /// Stage a path for removal and delete the working file.
    ///
    /// Fails with `NoReasonToRemove` unless the path is tracked in the
    /// current commit or staged for add. A staged-removal marker is
    /// recorded only for tracked paths.
    pub fn remove(&self, path: &str) -> Result<(), CoreError> {
        let (_, head) = self.current_commit()?;
        let tracked = head.tracks(path);
        let staged = self.stage.is_staged_for_add(path);

        if !tracked && !staged {
            return Err(CoreError::NoReasonToRemove(path.to_string()));
        }

        self.stage.unstage(path)?;
        self.worktree.remove(path)?;
        if tracked {
            self.stage.stage_remove(path)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Resolve the staging area into a new commit and advance the current
    /// branch to it.
    pub fn commit(&self, message: &str) -> Result<Digest, CoreError> {
        if message.is_empty() {
            return Err(CoreError::EmptyMessage);
        }
        if self.stage.is_empty()? {
            return Err(CoreError::NothingToCommit);
        }

        let (head_id, head) = self.current_commit()?;
        let mut commit = Commit::child_of(&head, head_id, Utc::now().timestamp(), message);
        for path in self.stage.removed_paths()? {
            commit.tree.remove(&path);
        }
        for path in self.stage.added_paths()? {
            let content = self.stage.staged_content(&path)?;
            let digest = self.store.put_blob(&content)?;
            commit.tree.insert(path, digest);
        }
        let id = self.store.put_commit(&commit)?;

        // The staging area is fully resolved before the branch reference
        // advances; a crash between these two steps is the only tolerated
        // inconsistency window.
        self.stage.clear()?;
        self.refs.advance_current(&id)?;

        info!(commit = %id.short(12), "committed");
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// First-parent history from the current tip back to the root.
    pub fn log(&self) -> Result<Vec<LogEntry>, CoreError> {
        let graph = self.graph();
        let mut entries = Vec::new();
        let mut cursor = Some(self.refs.current_tip()?);

        while let Some(id) = cursor {
            let commit = graph.load(&id)?;
            cursor = commit.first_parent.clone();
            entries.push(Self::log_entry(id, commit));
        }
        Ok(entries)
    }

    /// Every commit in the object store, in digest order.
    pub fn global_log(&self) -> Result<Vec<LogEntry>, CoreError> {
        let graph = self.graph();
        let mut entries = Vec::new();
        for id in self.store.list_commits()? {
            let commit = graph.load(&id)?;
            entries.push(Self::log_entry(id, commit));
        }
        Ok(entries)
    }

    fn log_entry(id: Digest, commit: Commit) -> LogEntry {
        let merge_parents = match (&commit.first_parent, &commit.second_parent) {
            (Some(first), Some(second)) => Some((first.clone(), second.clone())),
            _ => None,
        };
        LogEntry {
            id,
            merge_parents,
            timestamp: commit.timestamp,
            message: commit.message,
        }
    }

    /// Digests of every commit whose message equals `message` exactly.
    pub fn find(&self, message: &str) -> Result<Vec<Digest>, CoreError> {
        let graph = self.graph();
        let mut ids = Vec::new();
        for id in self.store.list_commits()? {
            if graph.load(&id)?.message == message {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Err(CoreError::NoSuchCommitMessage(message.to_string()));
        }
        Ok(ids)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Snapshot report of branches, staged changes, unstaged modifications
    /// and untracked files.
    pub fn status(&self) -> Result<StatusReport, CoreError> {
        let (_, head) = self.current_commit()?;

        let mut working = BTreeMap::new();
        for path in self.worktree.list()? {
            let digest = Digest::of_bytes(&self.worktree.read(&path)?);
            working.insert(path, digest);
        }

        let mut staged_add = BTreeMap::new();
        for path in self.stage.added_paths()? {
            let digest = Digest::of_bytes(&self.stage.staged_content(&path)?);
            staged_add.insert(path, digest);
        }

        Ok(status::compute(
            self.refs.branch_names()?,
            self.refs.current_branch()?,
            &working,
            &staged_add,
            &self.stage.removed_paths()?,
            &head.tree,
        ))
    }

    // -----------------------------------------------------------------------
    // Branches, checkout, reset
    // -----------------------------------------------------------------------

    /// Create a new branch at the current tip. Does not switch to it.
    pub fn create_branch(&self, name: &str) -> Result<(), CoreError> {
        let tip = self.refs.current_tip()?;
        self.refs.create_branch(name, &tip)?;
        Ok(())
    }

    /// Delete a branch pointer. The commits it pointed at remain stored.
    pub fn remove_branch(&self, name: &str) -> Result<(), CoreError> {
        self.refs.delete_branch(name)?;
        Ok(())
    }

    /// Switch to another branch, replacing every tracked/staged working
    /// file with the target tree's content and clearing the staging area.
    pub fn checkout_branch(&self, name: &str) -> Result<(), CoreError> {
        if !self.refs.branch_exists(name) {
            return Err(RefError::NoSuchBranch(name.to_string()).into());
        }
        if name == self.refs.current_branch()? {
            return Err(CoreError::AlreadyCurrent(name.to_string()));
        }
        let target_id = self.refs.read_branch(name)?;
        let target = self.graph().load(&target_id)?;

        self.check_no_obstruction(&target.tree)?;
        self.replace_working_tree(&target.tree)?;
        self.refs.set_current(name)?;
        self.stage.clear()?;
        info!(branch = name, "checked out");
        Ok(())
    }

    /// Restore one file from the current commit into the working tree.
    pub fn restore_file(&self, path: &str) -> Result<(), CoreError> {
        let (_, head) = self.current_commit()?;
        self.restore_from_tree(&head.tree, path)
    }

    /// Restore one file from an arbitrary commit (full digest or prefix)
    /// into the working tree.
    pub fn restore_file_from(&self, commit_id: &str, path: &str) -> Result<(), CoreError> {
        let (_, commit) = self.graph().resolve(commit_id)?;
        self.restore_from_tree(&commit.tree, path)
    }

    fn restore_from_tree(
        &self,
        tree: &BTreeMap<String, Digest>,
        path: &str,
    ) -> Result<(), CoreError> {
        let digest = tree
            .get(path)
            .ok_or_else(|| CoreError::PathNotInCommit(path.to_string()))?;
        let content = self.store.get_blob(digest)?;
        self.worktree.write(path, &content)?;
        Ok(())
    }

    /// Check out an arbitrary commit's tree and repoint the current branch
    /// at it. Same overwrite behavior as a branch checkout, without
    /// switching branches.
    pub fn reset(&self, commit_id: &str) -> Result<(), CoreError> {
        let (target_id, target) = self.graph().resolve(commit_id)?;
        self.check_no_obstruction(&target.tree)?;
        self.replace_working_tree(&target.tree)?;
        self.refs.advance_current(&target_id)?;
        self.stage.clear()?;
        info!(commit = %target_id.short(12), "reset");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Merge
    // -----------------------------------------------------------------------

    /// Merge the named branch into the current branch.
    pub fn merge(&self, branch: &str) -> Result<MergeOutcome, CoreError> {
        // Precondition order is observable: first failure wins.
        if !self.stage.is_empty()? {
            return Err(CoreError::UncommittedChanges);
        }
        if !self.refs.branch_exists(branch) {
            return Err(RefError::NoSuchBranch(branch.to_string()).into());
        }
        let current_name = self.refs.current_branch()?;
        if current_name == branch {
            return Err(CoreError::SelfMerge(branch.to_string()));
        }

        let current_id = self.refs.current_tip()?;
        let branch_id = self.refs.read_branch(branch)?;
        let graph = self.graph();
        let current = graph.load(&current_id)?;
        let target = graph.load(&branch_id)?;

        self.check_no_obstruction(&target.tree)?;

        let split_id = graph.split_point(&current_id, &branch_id)?;
        if split_id == branch_id {
            return Ok(MergeOutcome::AlreadyAncestor);
        }
        if split_id == current_id {
            self.replace_working_tree(&target.tree)?;
            self.refs.advance_current(&branch_id)?;
            info!(branch, "fast-forwarded");
            return Ok(MergeOutcome::FastForwarded);
        }
        let split = graph.load(&split_id)?;

        let mut paths: BTreeSet<&String> = BTreeSet::new();
        paths.extend(current.tree.keys());
        paths.extend(target.tree.keys());
        paths.extend(split.tree.keys());

        let mut tree = current.tree.clone();
        let mut conflicted = false;

        for path in paths {
            let cur = current.tree.get(path);
            let bra = target.tree.get(path);
            match merge::resolve_path(cur, split.tree.get(path), bra) {
                PathResolution::KeepCurrent => {
                    if let Some(digest) = cur {
                        let content = self.store.get_blob(digest)?;
                        self.worktree.write(path, &content)?;
                    }
                }
                PathResolution::TakeBranch => {
                    if let Some(digest) = bra {
                        let content = self.store.get_blob(digest)?;
                        self.worktree.write(path, &content)?;
                        tree.insert(path.clone(), digest.clone());
                    }
                }
                PathResolution::Delete => {
                    self.worktree.remove(path)?;
                    tree.remove(path);
                }
                PathResolution::LeaveAbsent => {}
                PathResolution::Conflict => {
                    let cur_content = match cur {
                        Some(digest) => Some(self.store.get_blob(digest)?),
                        None => None,
                    };
                    let bra_content = match bra {
                        Some(digest) => Some(self.store.get_blob(digest)?),
                        None => None,
                    };
                    let artifact = merge::conflict_artifact(
                        cur_content.as_deref(),
                        bra_content.as_deref(),
                    );
                    let digest = self.store.put_blob(&artifact)?;
                    self.worktree.write(path, &artifact)?;
                    tree.insert(path.clone(), digest);
                    conflicted = true;
                    debug!(path = %path, "merge conflict");
                }
            }
        }

        let commit = Commit {
            message: format!("Merged {branch} into {current_name}."),
            timestamp: Utc::now().timestamp(),
            tree,
            first_parent: Some(current_id),
            second_parent: Some(branch_id),
        };
        let id = self.store.put_commit(&commit)?;
        self.refs.advance_current(&id)?;

        info!(branch, commit = %id.short(12), conflicted, "merged");
        Ok(MergeOutcome::Merged {
            commit: id,
            conflicted,
        })
    }

    // -----------------------------------------------------------------------
    // Working-tree replacement
    // -----------------------------------------------------------------------

    /// Untracked working files: present in the working tree but neither
    /// staged for add nor (unless marked for removal) tracked by the
    /// current commit.
    fn untracked_paths(&self) -> Result<BTreeSet<String>, CoreError> {
        let (_, head) = self.current_commit()?;
        let added = self.stage.added_paths()?;
        let removed = self.stage.removed_paths()?;

        let mut untracked = BTreeSet::new();
        for path in self.worktree.list()? {
            if added.contains(&path) {
                continue;
            }
            if removed.contains(&path) || !head.tracks(&path) {
                untracked.insert(path);
            }
        }
        Ok(untracked)
    }

    /// Fail if any untracked working file appears in the incoming tree.
    fn check_no_obstruction(&self, incoming: &BTreeMap<String, Digest>) -> Result<(), CoreError> {
        for path in self.untracked_paths()? {
            if incoming.contains_key(&path) {
                return Err(CoreError::UntrackedObstruction(path));
            }
        }
        Ok(())
    }

    /// Delete every tracked/staged working file absent from `target`, then
    /// write out every file `target` holds. Untracked files survive.
    fn replace_working_tree(&self, target: &BTreeMap<String, Digest>) -> Result<(), CoreError> {
        let (_, head) = self.current_commit()?;
        let added = self.stage.added_paths()?;

        for path in self.worktree.list()? {
            let owned = head.tracks(&path) || added.contains(&path);
            if owned && !target.contains_key(&path) {
                self.worktree.remove(&path)?;
            }
        }
        for (path, digest) in target {
            let content = self.store.get_blob(digest)?;
            self.worktree.write(path, &content)?;
        }
        Ok(())
    }

    /// Path of the repository data directory (for inspection in tests).
    pub fn data_dir(&self) -> &Path {
        &self.dir
    }
}
