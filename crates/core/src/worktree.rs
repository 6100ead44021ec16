//! The working-tree boundary.
//!
//! All raw file-system access for user-visible files goes through this one
//! seam: a flat listing of plain files in the repository's directory plus
//! read/write/remove on single files. Only direct children are visible;
//! subdirectories (including the repository's own data directory) are
//! never listed and never tracked.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::WorktreeError;

/// Handle over the directory whose files are under version control.
pub struct Worktree {
    root: PathBuf,
}

impl Worktree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, WorktreeError> {
        // Only flat names address working files; anything with a separator
        // points outside the tracked set.
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(WorktreeError::FileNotFound(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Names of all plain files directly in the working directory, sorted.
    pub fn list(&self) -> Result<BTreeSet<String>, WorktreeError> {
        let mut names = BTreeSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.file_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read a working file. Fails with `FileNotFound` if the name does not
    /// address an existing plain file.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, WorktreeError> {
        let path = self.file_path(name)?;
        if !path.is_file() {
            return Err(WorktreeError::FileNotFound(name.to_string()));
        }
        Ok(fs::read(path)?)
    }

    /// Create or overwrite a working file.
    pub fn write(&self, name: &str, content: &[u8]) -> Result<(), WorktreeError> {
        fs::write(self.file_path(name)?, content)?;
        Ok(())
    }

    /// Delete a working file. Deleting an absent file is a no-op.
    pub fn remove(&self, name: &str) -> Result<(), WorktreeError> {
        let path = self.file_path(name)?;
        if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
