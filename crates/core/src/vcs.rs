//! Version-control collaborator interface
//!
//! Everything the checkpoint store needs from the underlying object
//! database: resolve and move references, list trees, read blobs, and write
//! blobs, trees and commits. `GitRepo` (libgit2) and [`MemoryRepo`] are the
//! two implementations.
//!
//! [`MemoryRepo`]: crate::memory::MemoryRepo

use crate::hash::{ObjectId, ObjectKind};
use crate::tree::TreeEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by an object database backend
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("object {id} is not a {expected}")]
    WrongKind { id: ObjectId, expected: ObjectKind },

    #[error("invalid tree entry name `{0}`")]
    InvalidEntryName(String),

    #[error("duplicate tree entry `{0}`")]
    DuplicateEntry(String),

    #[error("invalid object id `{0}`")]
    InvalidObjectId(String),

    #[error("corrupt object: {0}")]
    Corrupt(String),

    #[error(
        "reference {name} moved (expected {}, found {})",
        fmt_target(.expected),
        fmt_target(.actual)
    )]
    RefConflict {
        name: String,
        expected: Option<ObjectId>,
        actual: Option<ObjectId>,
    },

    #[error("object database error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl VcsError {
    /// Wrap a backend-specific error
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        VcsError::Backend(err.into())
    }
}

fn fmt_target(target: &Option<ObjectId>) -> String {
    match target {
        Some(id) => id.to_hex(),
        None => "nothing".to_string(),
    }
}

/// Expected current value of a reference when moving it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefExpectation {
    /// Move unconditionally
    Any,
    /// The reference must not exist yet
    Absent,
    /// The reference must currently point at this object
    Matches(ObjectId),
}

/// Plumbing operations the checkpoint store consumes
pub trait VersionControl {
    /// Top-level directory of the repository
    fn root(&self) -> &Path;

    /// Resolve a full reference name (`refs/heads/...`) to the object it points at
    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>, VcsError>;

    /// Root tree of a commit
    fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId, VcsError>;

    /// Direct entries of a tree
    fn list_tree(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>, VcsError>;

    /// Content of a blob
    fn read_blob(&self, blob: &ObjectId) -> Result<Vec<u8>, VcsError>;

    /// Content of the blob at a `/`-separated path below `tree`
    ///
    /// Returns `Ok(None)` when any path component is absent.
    fn read_blob_at(&self, tree: &ObjectId, path: &str) -> Result<Option<Vec<u8>>, VcsError> {
        let mut current = *tree;
        let mut components = path.split('/').filter(|c| !c.is_empty()).peekable();

        while let Some(component) = components.next() {
            let Some(entry) = self
                .list_tree(&current)?
                .into_iter()
                .find(|entry| entry.name == component)
            else {
                return Ok(None);
            };

            let last = components.peek().is_none();
            match (last, entry.kind()) {
                (true, ObjectKind::Blob) => return self.read_blob(&entry.id).map(Some),
                (false, ObjectKind::Tree) => current = entry.id,
                (true, _) => {
                    return Err(VcsError::WrongKind {
                        id: entry.id,
                        expected: ObjectKind::Blob,
                    })
                }
                (false, _) => {
                    return Err(VcsError::WrongKind {
                        id: entry.id,
                        expected: ObjectKind::Tree,
                    })
                }
            }
        }

        Ok(None)
    }

    /// Store content as a blob
    fn write_blob(&self, content: &[u8]) -> Result<ObjectId, VcsError>;

    /// Store a tree built from `entries`
    ///
    /// Implementations sort entries into canonical order and reject
    /// duplicate names.
    fn write_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId, VcsError>;

    /// Store a commit wrapping `tree`
    fn write_commit(
        &self,
        tree: &ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> Result<ObjectId, VcsError>;

    /// Point a reference at `target`, checking its current value first
    fn update_ref(
        &self,
        name: &str,
        target: &ObjectId,
        expected: RefExpectation,
        log_message: &str,
    ) -> Result<(), VcsError>;

    /// Delete a reference; returns whether it existed
    fn delete_ref(&self, name: &str) -> Result<bool, VcsError>;
}

impl<T: VersionControl + ?Sized> VersionControl for &T {
    fn root(&self) -> &Path {
        (**self).root()
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>, VcsError> {
        (**self).resolve_ref(name)
    }

    fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId, VcsError> {
        (**self).commit_tree(commit)
    }

    fn list_tree(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>, VcsError> {
        (**self).list_tree(tree)
    }

    fn read_blob(&self, blob: &ObjectId) -> Result<Vec<u8>, VcsError> {
        (**self).read_blob(blob)
    }

    fn read_blob_at(&self, tree: &ObjectId, path: &str) -> Result<Option<Vec<u8>>, VcsError> {
        (**self).read_blob_at(tree, path)
    }

    fn write_blob(&self, content: &[u8]) -> Result<ObjectId, VcsError> {
        (**self).write_blob(content)
    }

    fn write_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId, VcsError> {
        (**self).write_tree(entries)
    }

    fn write_commit(
        &self,
        tree: &ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> Result<ObjectId, VcsError> {
        (**self).write_commit(tree, parents, message)
    }

    fn update_ref(
        &self,
        name: &str,
        target: &ObjectId,
        expected: RefExpectation,
        log_message: &str,
    ) -> Result<(), VcsError> {
        (**self).update_ref(name, target, expected, log_message)
    }

    fn delete_ref(&self, name: &str) -> Result<bool, VcsError> {
        (**self).delete_ref(name)
    }
}
