//! libgit2-backed object database

use git2::{ErrorCode, ObjectType, Oid, Repository, Signature};
use partio_core::tree::canonicalize;
use partio_core::{
    EntryMode, ObjectId, ObjectKind, RefExpectation, TreeEntry, VcsError, VersionControl,
};
use std::path::{Path, PathBuf};
use tracing::debug;

const FALLBACK_NAME: &str = "partio";
const FALLBACK_EMAIL: &str = "partio@localhost";

/// A git repository opened through libgit2
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl GitRepo {
    /// Find the repository containing `path`
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, VcsError> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|err| match err.code() {
            ErrorCode::NotFound => VcsError::NotARepository(path.to_path_buf()),
            _ => VcsError::backend(err),
        })?;
        Ok(Self::from_repository(repo))
    }

    /// Open the repository rooted exactly at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VcsError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|err| match err.code() {
            ErrorCode::NotFound => VcsError::NotARepository(path.to_path_buf()),
            _ => VcsError::backend(err),
        })?;
        Ok(Self::from_repository(repo))
    }

    pub fn from_repository(repo: Repository) -> Self {
        let root = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        Self { repo, root }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Git directory shared by all worktrees
    ///
    /// A linked worktree's git dir names the shared one in its `commondir`
    /// file, relative to itself.
    pub fn common_dir(&self) -> PathBuf {
        let git_dir = self.repo.path();
        if !self.repo.is_worktree() {
            return git_dir.to_path_buf();
        }
        match std::fs::read_to_string(git_dir.join("commondir")) {
            Ok(content) => git_dir.join(content.trim()),
            Err(err) => {
                debug!(git_dir = %git_dir.display(), error = %err, "no commondir file, using git dir");
                git_dir.to_path_buf()
            }
        }
    }

    /// Directory holding hook scripts
    pub fn hooks_dir(&self) -> PathBuf {
        self.common_dir().join("hooks")
    }

    /// Committer identity from git config, or `partio <partio@localhost>`
    pub fn signature(&self) -> Result<Signature<'static>, VcsError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => Signature::now(FALLBACK_NAME, FALLBACK_EMAIL).map_err(VcsError::backend),
        }
    }
}

pub(crate) fn to_oid(id: &ObjectId) -> Result<Oid, VcsError> {
    Oid::from_bytes(id.as_bytes()).map_err(VcsError::backend)
}

pub(crate) fn from_oid(oid: Oid) -> Result<ObjectId, VcsError> {
    ObjectId::from_slice(oid.as_bytes())
}

/// Map a lookup failure, reporting missing objects by id
fn lookup(id: &ObjectId) -> impl FnOnce(git2::Error) -> VcsError + '_ {
    move |err| match err.code() {
        ErrorCode::NotFound => VcsError::ObjectNotFound(*id),
        _ => VcsError::backend(err),
    }
}

impl VersionControl for GitRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>, VcsError> {
        let reference = match self.repo.find_reference(name) {
            Ok(reference) => reference,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(VcsError::backend(err)),
        };
        let resolved = reference.resolve().map_err(VcsError::backend)?;
        resolved.target().map(from_oid).transpose()
    }

    fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId, VcsError> {
        let found = self
            .repo
            .find_commit(to_oid(commit)?)
            .map_err(lookup(commit))?;
        from_oid(found.tree_id())
    }

    fn list_tree(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>, VcsError> {
        let found = self.repo.find_tree(to_oid(tree)?).map_err(lookup(tree))?;
        found
            .iter()
            .map(|entry| {
                let name = entry
                    .name()
                    .ok_or_else(|| VcsError::Corrupt(format!("non UTF-8 entry name in tree {tree}")))?;
                let mode = EntryMode::from_octal(entry.filemode() as u32).ok_or_else(|| {
                    VcsError::Corrupt(format!(
                        "unsupported mode {:o} for {name} in tree {tree}",
                        entry.filemode()
                    ))
                })?;
                Ok(TreeEntry {
                    mode,
                    id: from_oid(entry.id())?,
                    name: name.to_string(),
                })
            })
            .collect()
    }

    fn read_blob(&self, blob: &ObjectId) -> Result<Vec<u8>, VcsError> {
        let found = self.repo.find_blob(to_oid(blob)?).map_err(lookup(blob))?;
        Ok(found.content().to_vec())
    }

    fn read_blob_at(&self, tree: &ObjectId, path: &str) -> Result<Option<Vec<u8>>, VcsError> {
        let found = self.repo.find_tree(to_oid(tree)?).map_err(lookup(tree))?;
        let entry = match found.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(VcsError::backend(err)),
        };
        let id = from_oid(entry.id())?;
        if entry.kind() != Some(ObjectType::Blob) {
            return Err(VcsError::WrongKind {
                id,
                expected: ObjectKind::Blob,
            });
        }
        self.read_blob(&id).map(Some)
    }

    fn write_blob(&self, content: &[u8]) -> Result<ObjectId, VcsError> {
        let oid = self.repo.blob(content).map_err(VcsError::backend)?;
        from_oid(oid)
    }

    fn write_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId, VcsError> {
        let entries = canonicalize(entries)?;
        let mut builder = self.repo.treebuilder(None).map_err(VcsError::backend)?;
        for entry in &entries {
            builder
                .insert(&entry.name, to_oid(&entry.id)?, entry.mode.as_octal() as i32)
                .map_err(lookup(&entry.id))?;
        }
        let oid = builder.write().map_err(VcsError::backend)?;
        from_oid(oid)
    }

    fn write_commit(
        &self,
        tree: &ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> Result<ObjectId, VcsError> {
        let tree_obj = self.repo.find_tree(to_oid(tree)?).map_err(lookup(tree))?;
        let parent_commits = parents
            .iter()
            .map(|parent| {
                self.repo
                    .find_commit(to_oid(parent)?)
                    .map_err(lookup(parent))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let parent_refs: Vec<_> = parent_commits.iter().collect();

        let sig = self.signature()?;
        let oid = self
            .repo
            .commit(None, &sig, &sig, message, &tree_obj, &parent_refs)
            .map_err(VcsError::backend)?;
        from_oid(oid)
    }

    fn update_ref(
        &self,
        name: &str,
        target: &ObjectId,
        expected: RefExpectation,
        log_message: &str,
    ) -> Result<(), VcsError> {
        let oid = to_oid(target)?;
        let result = match expected {
            RefExpectation::Any => self.repo.reference(name, oid, true, log_message),
            RefExpectation::Absent => self.repo.reference(name, oid, false, log_message),
            RefExpectation::Matches(current) => {
                self.repo
                    .reference_matching(name, oid, true, to_oid(&current)?, log_message)
            }
        };

        match result {
            Ok(_) => {
                debug!(name, target = %target.short(), "reference updated");
                Ok(())
            }
            Err(err) => {
                let actual = self.resolve_ref(name)?;
                let conflict = match expected {
                    RefExpectation::Any => false,
                    RefExpectation::Absent => actual.is_some(),
                    RefExpectation::Matches(current) => actual != Some(current),
                };
                if conflict {
                    Err(VcsError::RefConflict {
                        name: name.to_string(),
                        expected: match expected {
                            RefExpectation::Matches(current) => Some(current),
                            _ => None,
                        },
                        actual,
                    })
                } else {
                    Err(VcsError::backend(err))
                }
            }
        }
    }

    fn delete_ref(&self, name: &str) -> Result<bool, VcsError> {
        match self.repo.find_reference(name) {
            Ok(mut reference) => {
                reference.delete().map_err(VcsError::backend)?;
                Ok(true)
            }
            Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
            Err(err) => Err(VcsError::backend(err)),
        }
    }
}
