//! Atomic commit appender
//!
//! A write happens in two halves. [`prepare`](CheckpointStore::prepare)
//! writes every object (blobs, subtrees, merged root, commit) against the
//! current tip; nothing is visible yet. [`publish`](CheckpointStore::publish)
//! moves the branch reference, the single commit point.
//!
//! With [`RefUpdatePolicy::Unconditional`] two writers that prepared
//! against the same tip race: the second publish discards the first
//! writer's entry. [`RefUpdatePolicy::CompareAndSwap`] detects the moved
//! tip, re-merges against it and retries.

use crate::builder::build_checkpoint_tree;
use crate::checkpoint::{Checkpoint, SessionFiles};
use crate::error::StoreError;
use crate::id::CheckpointId;
use crate::merge::{merge_into_root, Placement};
use crate::store::CheckpointStore;
use crate::Result;
use partio_core::{ObjectId, RefExpectation, VcsError, VersionControl};
use tracing::{debug, info, warn};

/// How the branch reference is moved to the new commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdatePolicy {
    /// Overwrite the reference regardless of its current value
    Unconditional,
    /// Require the reference to still point at the parent commit
    CompareAndSwap { max_retries: u32 },
}

impl Default for RefUpdatePolicy {
    fn default() -> Self {
        RefUpdatePolicy::CompareAndSwap { max_retries: 3 }
    }
}

/// Objects written for a checkpoint that has not been published yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedWrite {
    pub id: CheckpointId,
    /// Tip the commit was built on
    pub parent: ObjectId,
    /// The `<rest>` subtree holding metadata and session files
    pub subtree: ObjectId,
    pub tree: ObjectId,
    pub commit: ObjectId,
}

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub id: CheckpointId,
    /// New branch tip
    pub commit: ObjectId,
    /// Root tree of the new tip
    pub tree: ObjectId,
}

fn commit_message(id: &CheckpointId) -> String {
    format!("checkpoint: {id}")
}

impl<V: VersionControl> CheckpointStore<V> {
    /// Store a checkpoint and its session files on the branch
    pub fn write(&self, checkpoint: &Checkpoint, files: &SessionFiles) -> Result<WriteReceipt> {
        let prepared = self.prepare(checkpoint, files)?;
        self.publish(prepared)
    }

    /// Write all objects for a checkpoint without moving the branch
    pub fn prepare(&self, checkpoint: &Checkpoint, files: &SessionFiles) -> Result<PreparedWrite> {
        checkpoint.validate()?;
        let parent = self.require_tip()?;

        let subtree = build_checkpoint_tree(&self.vcs, checkpoint, files)?;
        let (tree, commit) = self.commit_onto(&checkpoint.id, subtree, parent)?;

        Ok(PreparedWrite {
            id: checkpoint.id.clone(),
            parent,
            subtree,
            tree,
            commit,
        })
    }

    /// Advance the branch to a prepared commit
    pub fn publish(&self, prepared: PreparedWrite) -> Result<WriteReceipt> {
        match self.policy {
            RefUpdatePolicy::Unconditional => {
                self.advance(&prepared, RefExpectation::Any)?;
                Ok(self.receipt(prepared))
            }
            RefUpdatePolicy::CompareAndSwap { max_retries } => {
                self.publish_cas(prepared, max_retries)
            }
        }
    }

    fn publish_cas(&self, mut prepared: PreparedWrite, max_retries: u32) -> Result<WriteReceipt> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.advance(&prepared, RefExpectation::Matches(prepared.parent)) {
                Ok(()) => return Ok(self.receipt(prepared)),
                Err(StoreError::RefUpdate {
                    source: VcsError::RefConflict { actual, .. },
                    ..
                }) => {
                    if attempt > max_retries {
                        return Err(StoreError::Conflict {
                            branch: self.branch.clone(),
                            attempts: attempt,
                        });
                    }
                    let tip = actual.ok_or_else(|| StoreError::BranchMissing(self.branch.clone()))?;
                    warn!(
                        id = %prepared.id,
                        expected = %prepared.parent.short(),
                        actual = %tip.short(),
                        attempt,
                        "checkpoint branch moved, rebuilding"
                    );
                    let (tree, commit) = self.commit_onto(&prepared.id, prepared.subtree, tip)?;
                    prepared.parent = tip;
                    prepared.tree = tree;
                    prepared.commit = commit;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Merge `subtree` into the tree of `parent` and wrap it in a commit
    fn commit_onto(
        &self,
        id: &CheckpointId,
        subtree: ObjectId,
        parent: ObjectId,
    ) -> Result<(ObjectId, ObjectId)> {
        let root = self
            .vcs
            .commit_tree(&parent)
            .map_err(StoreError::read(format!("tip commit {}", parent.short())))?;

        let tree = merge_into_root(
            &self.vcs,
            &root,
            Placement {
                shard: id.shard(),
                rest: id.rest(),
                subtree,
            },
        )?;

        let commit = self
            .vcs
            .write_commit(&tree, &[parent], &commit_message(id))
            .map_err(StoreError::write(format!("commit for {id}")))?;

        debug!(id = %id, parent = %parent.short(), commit = %commit.short(), "checkpoint commit written");
        Ok((tree, commit))
    }

    fn advance(&self, prepared: &PreparedWrite, expected: RefExpectation) -> Result<()> {
        self.vcs
            .update_ref(
                &self.ref_name(),
                &prepared.commit,
                expected,
                &commit_message(&prepared.id),
            )
            .map_err(|source| StoreError::RefUpdate {
                branch: self.branch.clone(),
                source,
            })
    }

    fn receipt(&self, prepared: PreparedWrite) -> WriteReceipt {
        info!(id = %prepared.id, commit = %prepared.commit.short(), "checkpoint written");
        WriteReceipt {
            id: prepared.id,
            commit: prepared.commit,
            tree: prepared.tree,
        }
    }
}
