//! The commit snapshot record.
//!
//! A commit is fully determined by (parents, timestamp, message, tree): its
//! digest is the SHA-256 of the canonical JSON form of exactly those fields.
//! The tree is a `BTreeMap`, so serialization order is stable and equal
//! commits always serialize to equal bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Message of the implicit root commit created by `init`.
pub const ROOT_MESSAGE: &str = "initial commit";

/// An immutable snapshot of the file tree.
///
/// Parents are a tagged two-field shape, never a list: `second_parent` is
/// `Some` only for merge commits, `first_parent` is `None` only for the
/// root commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit message.
    pub message: String,
    /// Creation time as whole Unix seconds. Two otherwise-identical commits
    /// inside the same second collide to one object.
    pub timestamp: i64,
    /// File path to blob digest.
    pub tree: BTreeMap<String, Digest>,
    pub first_parent: Option<Digest>,
    pub second_parent: Option<Digest>,
}

impl Commit {
    /// The root commit: empty tree, no parents, epoch timestamp. Every
    /// fresh repository therefore shares a single root digest.
    pub fn root() -> Self {
        Self {
            message: ROOT_MESSAGE.to_string(),
            timestamp: 0,
            tree: BTreeMap::new(),
            first_parent: None,
            second_parent: None,
        }
    }

    /// A child of `parent_id`, tree copied from `parent`.
    pub fn child_of(parent: &Commit, parent_id: Digest, timestamp: i64, message: &str) -> Self {
        Self {
            message: message.to_string(),
            timestamp,
            tree: parent.tree.clone(),
            first_parent: Some(parent_id),
            second_parent: None,
        }
    }

    /// Whether this commit was produced by a merge.
    pub fn is_merge(&self) -> bool {
        self.second_parent.is_some()
    }

    /// Both parent edges, present ones only.
    pub fn parents(&self) -> impl Iterator<Item = &Digest> {
        self.first_parent.iter().chain(self.second_parent.iter())
    }

    pub fn tracks(&self, path: &str) -> bool {
        self.tree.contains_key(path)
    }
}
