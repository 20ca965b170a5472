//! Repository helpers used by hooks and commands

use crate::error::GitError;
use crate::repo::{from_oid, to_oid, GitRepo};
use git2::{
    build::CheckoutBuilder, BranchType, Cred, CredentialType, DiffFormat, ErrorCode, Patch,
    PushOptions, RemoteCallbacks,
};
use partio_core::ObjectId;
use tracing::{debug, info};

/// Per-file line counts of a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub path: String,
    pub added: usize,
    pub deleted: usize,
}

impl GitRepo {
    /// Commit HEAD points at; `None` on an unborn branch
    pub fn head_commit(&self) -> Result<Option<ObjectId>, GitError> {
        let head = match self.repository().head() {
            Ok(head) => head,
            Err(err) if matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None)
            }
            Err(err) => return Err(err.into()),
        };
        let commit = head.peel_to_commit()?;
        Ok(Some(from_oid(commit.id())?))
    }

    /// Short name of the checked-out branch; `None` when HEAD is detached
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        let head = self.repository().find_reference("HEAD")?;
        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .map(str::to_string))
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        match self.repository().find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Unified patch of a commit against its first parent
    ///
    /// A root commit is diffed against the empty tree.
    pub fn commit_diff(&self, commit: &ObjectId) -> Result<String, GitError> {
        let diff = self.diff_against_parent(commit)?;
        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;
        Ok(text)
    }

    /// Added and deleted line counts per file; binary files are skipped
    pub fn commit_numstat(&self, commit: &ObjectId) -> Result<Vec<FileStat>, GitError> {
        let diff = self.diff_against_parent(commit)?;
        let mut stats = Vec::new();
        for index in 0..diff.deltas().len() {
            let Some(delta) = diff.get_delta(index) else {
                continue;
            };
            if delta.flags().is_binary() {
                continue;
            }
            let Some(patch) = Patch::from_diff(&diff, index)? else {
                continue;
            };
            let (_, added, deleted) = patch.line_stats()?;
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            stats.push(FileStat {
                path,
                added,
                deleted,
            });
        }
        Ok(stats)
    }

    fn diff_against_parent(&self, commit: &ObjectId) -> Result<git2::Diff<'_>, GitError> {
        let repo = self.repository();
        let commit = repo.find_commit(to_oid(commit)?)?;
        let tree = commit.tree()?;
        let parent_tree = match commit.parent_count() {
            0 => None,
            _ => Some(commit.parent(0)?.tree()?),
        };
        Ok(repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?)
    }

    /// Rewrite HEAD's message with `Key: value` trailers appended
    ///
    /// Hooks are not run for the amended commit.
    pub fn amend_trailers(&self, trailers: &[(&str, &str)]) -> Result<ObjectId, GitError> {
        let repo = self.repository();
        let head = repo.head().map_err(|err| match err.code() {
            ErrorCode::UnbornBranch | ErrorCode::NotFound => GitError::UnbornHead,
            _ => err.into(),
        })?;
        let commit = head.peel_to_commit()?;

        let lines: Vec<String> = trailers
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect();
        let original = String::from_utf8_lossy(commit.message_bytes()).into_owned();
        let message = format!("{}\n\n{}\n", original.trim_end_matches('\n'), lines.join("\n"));

        let amended = commit.amend(Some("HEAD"), None, None, None, Some(&message), None)?;
        debug!(commit = %amended, trailers = lines.len(), "amended HEAD with trailers");
        Ok(from_oid(amended)?)
    }

    pub fn has_remote(&self, name: &str) -> bool {
        self.repository().find_remote(name).is_ok()
    }

    /// Push a local branch to `remote`
    ///
    /// Credentials come from ssh-agent for SSH URLs and from the configured
    /// git credential helper otherwise.
    pub fn push_branch(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        let repo = self.repository();
        let mut remote_handle = repo.find_remote(remote).map_err(|err| match err.code() {
            ErrorCode::NotFound => GitError::MissingRemote(remote.to_string()),
            _ => err.into(),
        })?;
        let config = repo.config()?;

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed| {
            if allowed.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Cred::credential_helper(&config, url, username);
            }
            Cred::default()
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        remote_handle.push(&[refspec.as_str()], Some(&mut options))?;
        info!(remote, branch, "pushed branch");
        Ok(())
    }

    /// Create `name` at `commit` and check it out
    pub fn checkout_new_branch(&self, name: &str, commit: &str) -> Result<(), GitError> {
        let repo = self.repository();
        if self.branch_exists(name)? {
            return Err(GitError::BranchExists(name.to_string()));
        }

        let target = repo.revparse_single(commit)?.peel_to_commit()?;
        let branch = repo.branch(name, &target, false)?;
        repo.checkout_tree(target.as_object(), Some(CheckoutBuilder::new().safe()))?;

        let refname = branch
            .get()
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("refs/heads/{name}"));
        repo.set_head(&refname)?;
        info!(branch = name, commit = %target.id(), "checked out new branch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use git2::{Repository, Signature};
    use std::path::Path;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, path: &str, content: &str, message: &str) -> Result<git2::Oid> {
        let root = repo.workdir().unwrap();
        std::fs::write(root.join(path), content)?;
        let mut index = repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;
        let tree = repo.find_tree(index.write_tree()?)?;
        let sig = Signature::now("Test", "test@example.com")?;
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        Ok(repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?)
    }

    fn setup() -> Result<(TempDir, GitRepo)> {
        let dir = TempDir::new()?;
        let repo = Repository::init(dir.path())?;
        commit_file(&repo, "a.txt", "one\n", "first")?;
        commit_file(&repo, "a.txt", "one\ntwo\nthree\n", "second")?;
        Ok((dir, GitRepo::from_repository(repo)))
    }

    #[test]
    fn test_unborn_head() -> Result<()> {
        let dir = TempDir::new()?;
        let git = GitRepo::from_repository(Repository::init(dir.path())?);
        assert_eq!(git.head_commit()?, None);
        assert!(git.current_branch()?.is_some());
        assert!(matches!(git.amend_trailers(&[]), Err(GitError::UnbornHead)));
        Ok(())
    }

    #[test]
    fn test_head_and_branch() -> Result<()> {
        let (_dir, git) = setup()?;
        assert!(git.head_commit()?.is_some());
        let branch = git.current_branch()?.unwrap();
        assert!(git.branch_exists(&branch)?);
        assert!(!git.branch_exists("partio/checkpoints/v1")?);
        Ok(())
    }

    #[test]
    fn test_commit_diff_and_numstat() -> Result<()> {
        let (_dir, git) = setup()?;
        let head = git.head_commit()?.unwrap();

        let diff = git.commit_diff(&head)?;
        assert!(diff.contains("diff --git a/a.txt b/a.txt"));
        assert!(diff.contains("+two\n"));
        assert!(diff.contains("+three\n"));

        let stats = git.commit_numstat(&head)?;
        assert_eq!(
            stats,
            vec![FileStat {
                path: "a.txt".to_string(),
                added: 2,
                deleted: 0
            }]
        );
        Ok(())
    }

    #[test]
    fn test_root_commit_diffs_against_empty_tree() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = Repository::init(dir.path())?;
        let oid = commit_file(&repo, "new.txt", "hello\n", "root")?;
        let git = GitRepo::from_repository(repo);

        let stats = git.commit_numstat(&from_oid(oid)?)?;
        assert_eq!(stats[0].added, 1);
        Ok(())
    }

    #[test]
    fn test_amend_trailers() -> Result<()> {
        let (_dir, git) = setup()?;
        git.amend_trailers(&[
            ("Partio-Checkpoint", "a1b2c3d4e5f6"),
            ("Partio-Attribution", "100% agent"),
        ])?;

        let head = git.repository().head()?.peel_to_commit()?;
        assert_eq!(
            head.message(),
            Some("second\n\nPartio-Checkpoint: a1b2c3d4e5f6\nPartio-Attribution: 100% agent\n")
        );
        assert_eq!(head.parent_count(), 1);
        Ok(())
    }

    #[test]
    fn test_checkout_new_branch() -> Result<()> {
        let (_dir, git) = setup()?;
        let first = git
            .repository()
            .head()?
            .peel_to_commit()?
            .parent(0)?
            .id()
            .to_string();

        git.checkout_new_branch("partio/rewind/a1b2c3d4e5f6", &first)?;
        assert_eq!(
            git.current_branch()?.as_deref(),
            Some("partio/rewind/a1b2c3d4e5f6")
        );
        assert_eq!(git.head_commit()?.map(|id| id.to_hex()), Some(first.clone()));
        assert!(matches!(
            git.checkout_new_branch("partio/rewind/a1b2c3d4e5f6", &first),
            Err(GitError::BranchExists(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_remote() -> Result<()> {
        let (_dir, git) = setup()?;
        assert!(!git.has_remote("origin"));
        assert!(matches!(
            git.push_branch("origin", "partio/checkpoints/v1"),
            Err(GitError::MissingRemote(_))
        ));
        Ok(())
    }
}
