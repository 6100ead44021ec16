//! Content-addressable object store.
//!
//! Persists two object kinds, blobs and commits, under separate roots,
//! each sharded by the first two hex digits of the digest to bound directory
//! size. `put` is idempotent and write-once; no update or delete operation
//! exists. `get` distinguishes an absent object (a valid state) from a
//! corrupt one (content that does not hash back to its key).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::commit::Commit;
use crate::digest::Digest;
use crate::errors::StoreError;

const BLOBS_DIR: &str = "blobs";
const COMMITS_DIR: &str = "commits";

/// Handle over the object store root (`<repo>/objects`).
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Open the store at `root` without touching the file system.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the on-disk layout. Idempotent.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::open(root);
        fs::create_dir_all(store.root.join(BLOBS_DIR))?;
        fs::create_dir_all(store.root.join(COMMITS_DIR))?;
        debug!(root = %store.root.display(), "object store initialized");
        Ok(store)
    }

    fn object_path(&self, family: &str, digest: &Digest) -> PathBuf {
        let hex = digest.as_str();
        self.root.join(family).join(&hex[..2]).join(&hex[2..])
    }

    fn put_object(&self, family: &str, content: &[u8]) -> Result<Digest, StoreError> {
        let digest = Digest::of_bytes(content);
        let path = self.object_path(family, &digest);
        if path.exists() {
            trace!(%digest, family, "object already stored");
            return Ok(digest);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        trace!(%digest, family, len = content.len(), "object stored");
        Ok(digest)
    }

    fn get_object(&self, family: &str, digest: &Digest) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(family, digest);
        if !path.is_file() {
            return Err(StoreError::NotFound(digest.clone()));
        }
        let content = fs::read(&path)?;
        if Digest::of_bytes(&content) != *digest {
            return Err(StoreError::Corrupt(digest.clone()));
        }
        Ok(content)
    }

    // -----------------------------------------------------------------------
    // Blobs
    // -----------------------------------------------------------------------

    /// Store blob content. Idempotent: equal content is stored once and
    /// always yields the same digest.
    pub fn put_blob(&self, content: &[u8]) -> Result<Digest, StoreError> {
        self.put_object(BLOBS_DIR, content)
    }

    pub fn get_blob(&self, digest: &Digest) -> Result<Vec<u8>, StoreError> {
        self.get_object(BLOBS_DIR, digest)
    }

    pub fn has_blob(&self, digest: &Digest) -> bool {
        self.object_path(BLOBS_DIR, digest).is_file()
    }

    // -----------------------------------------------------------------------
    // Commits
    // -----------------------------------------------------------------------

    /// Persist a commit under the digest of its canonical serialized form.
    ///
    /// Every digest reachable from the commit's tree must already be
    /// stored; an unresolved tree entry fails with `NotFound` before
    /// anything is written.
    pub fn put_commit(&self, commit: &Commit) -> Result<Digest, StoreError> {
        for digest in commit.tree.values() {
            if !self.has_blob(digest) {
                return Err(StoreError::NotFound(digest.clone()));
            }
        }
        let canonical = serde_json::to_vec(commit)?;
        self.put_object(COMMITS_DIR, &canonical)
    }

    pub fn get_commit(&self, digest: &Digest) -> Result<Commit, StoreError> {
        let bytes = self.get_object(COMMITS_DIR, digest)?;
        serde_json::from_slice(&bytes).map_err(|_| StoreError::Corrupt(digest.clone()))
    }

    /// Every stored commit digest, in lexicographic order.
    pub fn list_commits(&self) -> Result<Vec<Digest>, StoreError> {
        let mut digests = Vec::new();
        let commits_root = self.root.join(COMMITS_DIR);
        for shard in fs::read_dir(&commits_root)? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            let prefix = shard.file_name().to_string_lossy().into_owned();
            for entry in fs::read_dir(shard.path())? {
                let entry = entry?;
                let rest = entry.file_name().to_string_lossy().into_owned();
                if let Some(digest) = Digest::from_hex(&format!("{prefix}{rest}")) {
                    digests.push(digest);
                }
            }
        }
        digests.sort();
        Ok(digests)
    }

    /// First stored commit digest starting with `prefix`, in lexicographic
    /// order. Scans a single shard when the prefix covers one.
    pub fn find_commit_by_prefix(&self, prefix: &str) -> Result<Option<Digest>, StoreError> {
        if prefix.len() >= 2 {
            let shard = self.root.join(COMMITS_DIR).join(&prefix[..2]);
            if !shard.is_dir() {
                return Ok(None);
            }
            let mut matches: Vec<Digest> = Vec::new();
            for entry in fs::read_dir(&shard)? {
                let entry = entry?;
                let rest = entry.file_name().to_string_lossy().into_owned();
                if let Some(digest) = Digest::from_hex(&format!("{}{rest}", &prefix[..2])) {
                    if digest.starts_with(prefix) {
                        matches.push(digest);
                    }
                }
            }
            matches.sort();
            return Ok(matches.into_iter().next());
        }
        Ok(self
            .list_commits()?
            .into_iter()
            .find(|d| d.starts_with(prefix)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::init(dir.path().join("objects")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_blob_idempotent() {
        let (_dir, store) = store();
        let d1 = store.put_blob(b"same content").unwrap();
        let d2 = store.put_blob(b"same content").unwrap();
        assert_eq!(d1, d2);
        assert_eq!(store.get_blob(&d1).unwrap(), b"same content");
    }

    #[test]
    fn test_get_absent_blob_is_not_found() {
        let (_dir, store) = store();
        let missing = Digest::of_bytes(b"never stored");
        assert!(matches!(
            store.get_blob(&missing),
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.has_blob(&missing));
    }

    #[test]
    fn test_corrupt_blob_detected() {
        let (_dir, store) = store();
        let digest = store.put_blob(b"original").unwrap();
        let hex = digest.as_str();
        let path = store
            .root
            .join(BLOBS_DIR)
            .join(&hex[..2])
            .join(&hex[2..]);
        fs::write(&path, b"tampered").unwrap();
        assert!(matches!(
            store.get_blob(&digest),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_commit_round_trip() {
        let (_dir, store) = store();
        let mut commit = Commit::root();
        commit
            .tree
            .insert("f.txt".into(), store.put_blob(b"f").unwrap());
        let id = store.put_commit(&commit).unwrap();
        assert_eq!(store.get_commit(&id).unwrap(), commit);
    }

    #[test]
    fn test_put_commit_requires_tree_blobs() {
        let (_dir, store) = store();
        let mut commit = Commit::root();
        commit
            .tree
            .insert("f.txt".into(), Digest::of_bytes(b"never stored"));
        assert!(matches!(
            store.put_commit(&commit),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_and_prefix_lookup() {
        let (_dir, store) = store();
        let id = store.put_commit(&Commit::root()).unwrap();
        assert_eq!(store.list_commits().unwrap(), vec![id.clone()]);

        let found = store.find_commit_by_prefix(id.short(8)).unwrap();
        assert_eq!(found, Some(id));
        assert_eq!(store.find_commit_by_prefix("ffffffff").unwrap(), None);
    }
}
