//! Throwaway git repositories with an isolated home directory

use super::cli::PartioCommand;
use anyhow::{Context, Result};
use git2::{Repository, Signature};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A git repository plus a fake `$HOME` for partio to run against
pub struct TestRepo {
    dir: TempDir,
    home: TempDir,
    repo: Repository,
}

impl TestRepo {
    /// Fresh repository with one commit on its default branch
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let home = TempDir::new()?;
        let repo = Repository::init(dir.path())?;
        let test_repo = Self { dir, home, repo };
        test_repo.commit("README.md", "# test\n", "initial commit")?;
        Ok(test_repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// `partio <args>` in this repository with `$HOME` isolated
    pub fn partio(&self, args: &[&str]) -> PartioCommand {
        let mut cmd = PartioCommand::new(self.path());
        cmd.args(args).env("HOME", &self.home().to_string_lossy());
        cmd
    }

    /// Write `path` and commit it on HEAD; returns the commit hash
    pub fn commit(&self, path: &str, content: &str, message: &str) -> Result<String> {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)?;

        let mut index = self.repo.index()?;
        index.add_path(Path::new(path))?;
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;
        let sig = Signature::now("Test", "test@example.com")?;
        let parents = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit()?],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)?;
        Ok(oid.to_string())
    }

    pub fn head_hash(&self) -> Result<String> {
        Ok(self.repo.head()?.peel_to_commit()?.id().to_string())
    }

    pub fn head_message(&self) -> Result<String> {
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.message().context("non-UTF-8 message")?.to_string())
    }

    /// Write a Claude Code transcript under the fake home
    pub fn write_transcript(&self, lines: &[&str]) -> Result<PathBuf> {
        let path = self.home().join("session.jsonl");
        fs::write(&path, lines.join("\n"))?;
        Ok(path)
    }

    /// Record pre-commit state the way the pre-commit hook does
    pub fn record_pre_commit(&self, session: &Path, agent_active: bool) -> Result<()> {
        let path = self.state_file();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let state = serde_json::json!({
            "agent_active": agent_active,
            "session_path": session,
            "pre_commit_hash": self.head_hash()?,
            "branch": "main",
        });
        fs::write(&path, serde_json::to_vec_pretty(&state)?)?;
        Ok(())
    }

    pub fn state_file(&self) -> PathBuf {
        self.path().join(".partio").join("state").join("pre-commit.json")
    }
}
