//! Errors raised by repository helpers and hook installation

use partio_core::VcsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("{action} {}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HEAD does not point at a commit yet")]
    UnbornHead,

    #[error("branch {0} already exists")]
    BranchExists(String),

    #[error("remote {0} is not configured")]
    MissingRemote(String),
}

impl GitError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| GitError::Io {
            action,
            path,
            source,
        }
    }
}
