//! Read-only traversal over the immutable commit graph.
//!
//! Commits link backwards through at most two parent digests; ancestry is
//! discovered only by walking parent edges from a known tip. This module
//! provides commit resolution (full digest or unambiguous prefix), ancestry
//! maps, and the split-point computation that anchors three-way merges.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::commit::Commit;
use crate::digest::Digest;
use crate::errors::{GraphError, StoreError};
use crate::store::ObjectStore;

/// Traversal facade borrowing the object store.
pub struct CommitGraph<'a> {
    store: &'a ObjectStore,
}

impl<'a> CommitGraph<'a> {
    pub fn new(store: &'a ObjectStore) -> Self {
        Self { store }
    }

    /// Load a commit by exact digest, mapping an absent object to
    /// [`GraphError::CommitNotFound`].
    pub fn load(&self, digest: &Digest) -> Result<Commit, GraphError> {
        match self.store.get_commit(digest) {
            Ok(commit) => Ok(commit),
            Err(StoreError::NotFound(_)) => {
                Err(GraphError::CommitNotFound(digest.as_str().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a full digest or an abbreviated prefix to a stored commit.
    ///
    /// Fails with [`GraphError::CommitNotFound`] when no stored commit's
    /// digest starts with `id`. If a prefix matches more than one commit the
    /// first match in digest order wins (callers are expected to supply
    /// unambiguous prefixes).
    pub fn resolve(&self, id: &str) -> Result<(Digest, Commit), GraphError> {
        if let Some(digest) = Digest::from_hex(id) {
            let commit = self.load(&digest)?;
            return Ok((digest, commit));
        }
        let digest = self
            .store
            .find_commit_by_prefix(id)?
            .ok_or_else(|| GraphError::CommitNotFound(id.to_string()))?;
        let commit = self.load(&digest)?;
        Ok((digest, commit))
    }

    /// Map every commit reachable from `tip` (itself included, distance 0)
    /// to its minimum distance from `tip`, breadth-first over both parent
    /// edges. A digest reached along multiple paths keeps the minimum of
    /// all observed path lengths.
    pub fn ancestry_map(&self, tip: &Digest) -> Result<BTreeMap<Digest, u32>, GraphError> {
        let mut distances: BTreeMap<Digest, u32> = BTreeMap::new();
        let mut queue: VecDeque<(Digest, u32)> = VecDeque::new();
        queue.push_back((tip.clone(), 0));

        while let Some((digest, distance)) = queue.pop_front() {
            if distances.contains_key(&digest) {
                continue;
            }
            let commit = self.load(&digest)?;
            distances.insert(digest, distance);
            for parent in commit.parents() {
                if !distances.contains_key(parent) {
                    queue.push_back((parent.clone(), distance + 1));
                }
            }
        }
        Ok(distances)
    }

    /// The split point of two tips: the commit present in both ancestries
    /// with the smallest distance from `current`. Ties on distance resolve
    /// to the smallest digest, so the result is deterministic for a given
    /// pair of ancestry maps.
    pub fn split_point(&self, current: &Digest, branch: &Digest) -> Result<Digest, GraphError> {
        let current_map = self.ancestry_map(current)?;
        let branch_map = self.ancestry_map(branch)?;

        let mut best: Option<(&Digest, u32)> = None;
        for (digest, &distance) in &current_map {
            if !branch_map.contains_key(digest) {
                continue;
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((digest, distance)),
            }
        }

        let (split, distance) = best.ok_or_else(|| {
            GraphError::NoCommonAncestor(current.clone(), branch.clone())
        })?;
        debug!(%split, distance, "split point computed");
        Ok(split.clone())
    }
}
