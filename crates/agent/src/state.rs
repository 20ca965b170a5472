//! Hand-off file between the pre-commit and post-commit hooks

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// What the pre-commit hook observed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCommitState {
    pub agent_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_commit_hash: Option<String>,
    #[serde(default)]
    pub branch: String,
}

impl PreCommitState {
    /// `.partio/state/pre-commit.json` under `repo_root`
    pub fn path(repo_root: &Path) -> PathBuf {
        repo_root.join(".partio").join("state").join("pre-commit.json")
    }

    pub fn save(&self, repo_root: &Path) -> Result<()> {
        let path = Self::path(repo_root);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(AgentError::io(dir))?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|source| AgentError::State {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(AgentError::io(&path))
    }

    /// Read and remove the state file; `None` when there is none
    ///
    /// The file is removed before it is parsed so an amend triggered by the
    /// post-commit hook never sees it again.
    pub fn take(repo_root: &Path) -> Result<Option<Self>> {
        let path = Self::path(repo_root);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AgentError::io(&path)(err)),
        };
        fs::remove_file(&path).map_err(AgentError::io(&path))?;

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| AgentError::State { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_take_once() -> Result<()> {
        let dir = TempDir::new()?;
        let state = PreCommitState {
            agent_active: true,
            session_path: Some(PathBuf::from("/tmp/session.jsonl")),
            pre_commit_hash: Some("abc123".to_string()),
            branch: "main".to_string(),
        };
        state.save(dir.path())?;

        assert_eq!(PreCommitState::take(dir.path())?, Some(state));
        assert!(!PreCommitState::path(dir.path()).exists());
        assert_eq!(PreCommitState::take(dir.path())?, None);
        Ok(())
    }

    #[test]
    fn test_optional_fields_omitted() -> Result<()> {
        let dir = TempDir::new()?;
        PreCommitState {
            branch: "main".to_string(),
            ..Default::default()
        }
        .save(dir.path())?;

        let raw = fs::read_to_string(PreCommitState::path(dir.path()))?;
        assert!(!raw.contains("session_path"));
        assert!(!raw.contains("pre_commit_hash"));
        assert!(raw.contains("\"agent_active\": false"));
        Ok(())
    }

    #[test]
    fn test_corrupt_state_is_removed() -> Result<()> {
        let dir = TempDir::new()?;
        let path = PreCommitState::path(dir.path());
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(&path, "not json")?;

        assert!(matches!(
            PreCommitState::take(dir.path()),
            Err(AgentError::State { .. })
        ));
        assert!(!path.exists());
        Ok(())
    }
}
