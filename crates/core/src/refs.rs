//! Branch reference store.
//!
//! Named, mutable pointers to commit digests: one file per branch under
//! `refs/heads`, each holding a digest as its entire content, plus a
//! `refs/current` file naming the current branch. Exactly one branch is
//! current at all times, and the current branch can never be deleted.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::digest::Digest;
use crate::errors::RefError;

const HEADS_DIR: &str = "heads";
const CURRENT_FILE: &str = "current";

/// Handle over the reference root (`<repo>/refs`).
pub struct RefStore {
    heads_dir: PathBuf,
    current_file: PathBuf,
}

impl RefStore {
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            heads_dir: root.join(HEADS_DIR),
            current_file: root.join(CURRENT_FILE),
        }
    }

    /// Create the layout with `default_branch` pointing at `tip` and marked
    /// current.
    pub fn init(
        root: impl AsRef<Path>,
        default_branch: &str,
        tip: &Digest,
    ) -> Result<Self, RefError> {
        let refs = Self::open(root);
        fs::create_dir_all(&refs.heads_dir)?;
        refs.write_branch(default_branch, tip)?;
        refs.set_current(default_branch)?;
        debug!(branch = default_branch, %tip, "reference store initialized");
        Ok(refs)
    }

    fn write_branch(&self, name: &str, tip: &Digest) -> Result<(), RefError> {
        fs::write(self.heads_dir.join(name), tip.as_str())?;
        Ok(())
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.heads_dir.join(name).is_file()
    }

    /// All branch names, sorted.
    pub fn branch_names(&self) -> Result<Vec<String>, RefError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.heads_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create a new branch at `tip`. Fails if the name is taken.
    pub fn create_branch(&self, name: &str, tip: &Digest) -> Result<(), RefError> {
        if self.branch_exists(name) {
            return Err(RefError::BranchExists(name.to_string()));
        }
        self.write_branch(name, tip)
    }

    /// Delete a branch. The current branch cannot be deleted.
    pub fn delete_branch(&self, name: &str) -> Result<(), RefError> {
        if !self.branch_exists(name) {
            return Err(RefError::NoSuchBranch(name.to_string()));
        }
        if name == self.current_branch()? {
            return Err(RefError::CurrentBranch(name.to_string()));
        }
        fs::remove_file(self.heads_dir.join(name))?;
        Ok(())
    }

    /// The commit digest a branch points at.
    pub fn read_branch(&self, name: &str) -> Result<Digest, RefError> {
        let path = self.heads_dir.join(name);
        if !path.is_file() {
            return Err(RefError::NoSuchBranch(name.to_string()));
        }
        let content = fs::read_to_string(path)?;
        Digest::from_hex(content.trim()).ok_or_else(|| RefError::InvalidDigest(name.to_string()))
    }

    /// Repoint an existing branch.
    pub fn set_branch(&self, name: &str, tip: &Digest) -> Result<(), RefError> {
        if !self.branch_exists(name) {
            return Err(RefError::NoSuchBranch(name.to_string()));
        }
        self.write_branch(name, tip)
    }

    /// Name of the current branch.
    pub fn current_branch(&self) -> Result<String, RefError> {
        Ok(fs::read_to_string(&self.current_file)?.trim().to_string())
    }

    /// Switch the current branch marker.
    pub fn set_current(&self, name: &str) -> Result<(), RefError> {
        fs::write(&self.current_file, name)?;
        Ok(())
    }

    /// The commit digest the current branch points at.
    pub fn current_tip(&self) -> Result<Digest, RefError> {
        self.read_branch(&self.current_branch()?)
    }

    /// Advance the current branch to `tip` without switching branches.
    pub fn advance_current(&self, tip: &Digest) -> Result<(), RefError> {
        let name = self.current_branch()?;
        self.write_branch(&name, tip)
    }
}
