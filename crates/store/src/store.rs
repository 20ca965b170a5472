//! Checkpoint store handle and branch lifecycle

use crate::append::RefUpdatePolicy;
use crate::error::StoreError;
use crate::Result;
use partio_core::{ObjectId, RefExpectation, VersionControl};
use tracing::{debug, info};

/// Branch that holds checkpoint data
pub const CHECKPOINT_BRANCH: &str = "partio/checkpoints/v1";

/// Message of the root commit of a freshly created branch
pub const INIT_MESSAGE: &str = "partio: initialize checkpoint storage";

/// Append-only checkpoint log stored on an orphan branch
///
/// The store never creates its branch implicitly; call
/// [`initialize`](Self::initialize) once (as `partio enable` does) before
/// writing.
pub struct CheckpointStore<V> {
    pub(crate) vcs: V,
    pub(crate) branch: String,
    pub(crate) policy: RefUpdatePolicy,
}

impl<V: VersionControl> CheckpointStore<V> {
    pub fn new(vcs: V) -> Self {
        Self {
            vcs,
            branch: CHECKPOINT_BRANCH.to_string(),
            policy: RefUpdatePolicy::default(),
        }
    }

    /// Use a different branch name
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Choose how the branch reference is advanced
    pub fn with_policy(mut self, policy: RefUpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Short branch name
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn policy(&self) -> RefUpdatePolicy {
        self.policy
    }

    /// Full reference name of the branch
    pub fn ref_name(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }

    /// Current tip commit, if the branch exists
    pub fn tip(&self) -> Result<Option<ObjectId>> {
        self.vcs
            .resolve_ref(&self.ref_name())
            .map_err(StoreError::read(format!("reference {}", self.branch)))
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.tip()?.is_some())
    }

    pub(crate) fn require_tip(&self) -> Result<ObjectId> {
        self.tip()?
            .ok_or_else(|| StoreError::BranchMissing(self.branch.clone()))
    }

    /// Root tree at the current tip
    pub(crate) fn root_tree(&self) -> Result<ObjectId> {
        let tip = self.require_tip()?;
        self.vcs
            .commit_tree(&tip)
            .map_err(StoreError::read(format!("tip commit {}", tip.short())))
    }

    /// Create the branch with an empty-tree root commit
    ///
    /// Returns the existing tip unchanged when the branch is already there.
    pub fn initialize(&self) -> Result<ObjectId> {
        if let Some(tip) = self.tip()? {
            debug!(branch = %self.branch, tip = %tip.short(), "checkpoint branch already exists");
            return Ok(tip);
        }

        let tree = self
            .vcs
            .write_tree(&[])
            .map_err(StoreError::write("empty root tree"))?;
        let commit = self
            .vcs
            .write_commit(&tree, &[], INIT_MESSAGE)
            .map_err(StoreError::write("initial checkpoint commit"))?;
        self.vcs
            .update_ref(&self.ref_name(), &commit, RefExpectation::Absent, INIT_MESSAGE)
            .map_err(|source| StoreError::RefUpdate {
                branch: self.branch.clone(),
                source,
            })?;

        info!(branch = %self.branch, commit = %commit.short(), "created checkpoint branch");
        Ok(commit)
    }

    /// Delete the branch and create it again, empty
    ///
    /// This is the only operation that removes checkpoints.
    pub fn reset(&self) -> Result<ObjectId> {
        let existed = self
            .vcs
            .delete_ref(&self.ref_name())
            .map_err(|source| StoreError::RefUpdate {
                branch: self.branch.clone(),
                source,
            })?;
        debug!(branch = %self.branch, existed, "deleted checkpoint branch");
        self.initialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use partio_core::{FailPoint, MemoryRepo};

    #[test]
    fn test_missing_branch() -> Result<()> {
        let store = CheckpointStore::new(MemoryRepo::new());
        assert!(!store.exists()?);
        assert_eq!(store.tip()?, None);
        assert!(store.require_tip().unwrap_err().is_branch_missing());
        Ok(())
    }

    #[test]
    fn test_initialize_creates_orphan_root() -> Result<()> {
        let repo = MemoryRepo::new();
        let store = CheckpointStore::new(&repo);
        let tip = store.initialize()?;

        assert!(store.exists()?);
        assert_eq!(repo.commit_tree(&tip)?, ObjectId::empty_tree());
        assert!(repo.commit_parents(&tip)?.is_empty());
        assert_eq!(repo.commit_message(&tip)?, INIT_MESSAGE);
        assert_eq!(repo.ref_names(), ["refs/heads/partio/checkpoints/v1"]);
        Ok(())
    }

    #[test]
    fn test_initialize_is_idempotent() -> Result<()> {
        let store = CheckpointStore::new(MemoryRepo::new());
        let first = store.initialize()?;
        assert_eq!(store.initialize()?, first);
        Ok(())
    }

    #[test]
    fn test_custom_branch() -> Result<()> {
        let repo = MemoryRepo::new();
        let store = CheckpointStore::new(&repo).with_branch("partio/test");
        store.initialize()?;
        assert_eq!(repo.ref_names(), ["refs/heads/partio/test"]);
        Ok(())
    }

    #[test]
    fn test_initialize_ref_failure_leaves_branch_absent() -> Result<()> {
        let repo = MemoryRepo::new();
        repo.fail_next(FailPoint::UpdateRef);
        let store = CheckpointStore::new(&repo);

        assert!(matches!(
            store.initialize(),
            Err(StoreError::RefUpdate { .. })
        ));
        assert!(!store.exists()?);
        Ok(())
    }
}
