//! The staging area.
//!
//! A mutable, transient overlay recording pending "add" and "remove"
//! intents. Each staged path is one file on disk: full content under
//! `stage/add`, an empty marker under `stage/remove`. A path holds at most
//! one of the two at any time; the next successful commit consumes and
//! clears everything.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::StageError;

const ADD_DIR: &str = "add";
const REMOVE_DIR: &str = "remove";

/// Handle over the staging root (`<repo>/stage`).
pub struct StagingArea {
    add_dir: PathBuf,
    remove_dir: PathBuf,
}

impl StagingArea {
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            add_dir: root.join(ADD_DIR),
            remove_dir: root.join(REMOVE_DIR),
        }
    }

    /// Create the on-disk layout. Idempotent.
    pub fn init(root: impl AsRef<Path>) -> Result<Self, StageError> {
        let stage = Self::open(root);
        fs::create_dir_all(&stage.add_dir)?;
        fs::create_dir_all(&stage.remove_dir)?;
        Ok(stage)
    }

    /// Record `path` as staged for add with the given content, clearing any
    /// staged-removal for the same path.
    pub fn stage_add(&self, path: &str, content: &[u8]) -> Result<(), StageError> {
        fs::write(self.add_dir.join(path), content)?;
        remove_if_present(&self.remove_dir.join(path))?;
        debug!(path, "staged for add");
        Ok(())
    }

    /// Record `path` as staged for removal, clearing any staged-add for the
    /// same path.
    pub fn stage_remove(&self, path: &str) -> Result<(), StageError> {
        fs::write(self.remove_dir.join(path), b"")?;
        remove_if_present(&self.add_dir.join(path))?;
        debug!(path, "staged for removal");
        Ok(())
    }

    /// Drop both kinds of staging entry for `path`, if present.
    pub fn unstage(&self, path: &str) -> Result<(), StageError> {
        remove_if_present(&self.add_dir.join(path))?;
        remove_if_present(&self.remove_dir.join(path))?;
        Ok(())
    }

    pub fn is_empty(&self) -> Result<bool, StageError> {
        Ok(self.added_paths()?.is_empty() && self.removed_paths()?.is_empty())
    }

    /// Remove every staged entry.
    pub fn clear(&self) -> Result<(), StageError> {
        for dir in [&self.add_dir, &self.remove_dir] {
            for entry in fs::read_dir(dir)? {
                fs::remove_file(entry?.path())?;
            }
        }
        Ok(())
    }

    /// Content of a staged-add entry.
    pub fn staged_content(&self, path: &str) -> Result<Vec<u8>, StageError> {
        let file = self.add_dir.join(path);
        if !file.is_file() {
            return Err(StageError::NotStaged(path.to_string()));
        }
        Ok(fs::read(file)?)
    }

    pub fn is_staged_for_add(&self, path: &str) -> bool {
        self.add_dir.join(path).is_file()
    }

    pub fn is_staged_for_removal(&self, path: &str) -> bool {
        self.remove_dir.join(path).is_file()
    }

    /// Snapshot of the staged-add path set.
    pub fn added_paths(&self) -> Result<BTreeSet<String>, StageError> {
        list_names(&self.add_dir)
    }

    /// Snapshot of the staged-removal path set.
    pub fn removed_paths(&self) -> Result<BTreeSet<String>, StageError> {
        list_names(&self.remove_dir)
    }
}

fn list_names(dir: &Path) -> Result<BTreeSet<String>, StageError> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn remove_if_present(path: &Path) -> Result<(), StageError> {
    if path.is_file() {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stage() -> (TempDir, StagingArea) {
        let dir = TempDir::new().unwrap();
        let stage = StagingArea::init(dir.path().join("stage")).unwrap();
        (dir, stage)
    }

    #[test]
    fn test_add_then_remove_is_exclusive() {
        let (_dir, stage) = stage();
        stage.stage_add("f.txt", b"content").unwrap();
        assert!(stage.is_staged_for_add("f.txt"));

        stage.stage_remove("f.txt").unwrap();
        assert!(!stage.is_staged_for_add("f.txt"));
        assert!(stage.is_staged_for_removal("f.txt"));

        stage.stage_add("f.txt", b"again").unwrap();
        assert!(stage.is_staged_for_add("f.txt"));
        assert!(!stage.is_staged_for_removal("f.txt"));
    }

    #[test]
    fn test_staged_content_round_trip() {
        let (_dir, stage) = stage();
        stage.stage_add("f.txt", b"payload").unwrap();
        assert_eq!(stage.staged_content("f.txt").unwrap(), b"payload");

        assert!(matches!(
            stage.staged_content("other.txt"),
            Err(StageError::NotStaged(_))
        ));
    }

    #[test]
    fn test_clear_empties_both_sides() {
        let (_dir, stage) = stage();
        assert!(stage.is_empty().unwrap());

        stage.stage_add("a.txt", b"a").unwrap();
        stage.stage_remove("b.txt").unwrap();
        assert!(!stage.is_empty().unwrap());

        stage.clear().unwrap();
        assert!(stage.is_empty().unwrap());
        assert!(stage.added_paths().unwrap().is_empty());
        assert!(stage.removed_paths().unwrap().is_empty());
    }

    #[test]
    fn test_unstage_drops_both_kinds() {
        let (_dir, stage) = stage();
        stage.stage_add("a.txt", b"a").unwrap();
        stage.unstage("a.txt").unwrap();
        assert!(stage.is_empty().unwrap());
    }
}
