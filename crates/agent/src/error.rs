//! Errors raised while locating and reading agent sessions

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("could not determine the home directory")]
    NoHomeDir,

    #[error("no Claude session directory found for {}", .0.display())]
    SessionDirMissing(PathBuf),

    #[error("no JSONL session files found in {}", .0.display())]
    NoTranscripts(PathBuf),

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to check for a running agent process")]
    ProcessCheck(#[source] std::io::Error),

    #[error("invalid state file {}", .path.display())]
    State {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AgentError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| AgentError::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
