//! Agent detection seam

use crate::error::Result;
use crate::session::SessionData;
use std::path::{Path, PathBuf};

/// Locates a coding agent and its session transcripts
pub trait Detector {
    /// Agent name recorded on checkpoints
    fn name(&self) -> &'static str;

    /// Whether an agent process is currently running
    fn is_running(&self) -> Result<bool>;

    /// Directory holding transcripts for the repository at `repo_root`
    fn find_session_dir(&self, repo_root: &Path) -> Result<PathBuf>;

    /// Newest transcript for `repo_root`, parsed
    fn find_latest_session(&self, repo_root: &Path) -> Result<(PathBuf, SessionData)>;
}
