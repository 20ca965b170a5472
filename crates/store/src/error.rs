//! Errors raised by the checkpoint store

use partio_core::VcsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("checkpoint branch {0} does not exist (run `partio enable` to create it)")]
    BranchMissing(String),

    #[error("malformed checkpoint id `{id}`: {reason}")]
    MalformedIdentifier { id: String, reason: String },

    #[error("checkpoint {0} already exists")]
    DuplicateIdentifier(String),

    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    #[error("failed to write {what}")]
    ObjectWrite {
        what: String,
        #[source]
        source: VcsError,
    },

    #[error("failed to read {what}")]
    ObjectRead {
        what: String,
        #[source]
        source: VcsError,
    },

    #[error("failed to advance {branch}")]
    RefUpdate {
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("{branch} kept moving, gave up after {attempts} attempts")]
    Conflict { branch: String, attempts: u32 },

    #[error("metadata unavailable for checkpoint {id}: {reason}")]
    MetadataUnavailable { id: String, reason: String },

    #[error("checkpoint {id} has no {file}")]
    SessionFileMissing { id: String, file: &'static str },

    #[error("failed to encode {what}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn write(what: impl Into<String>) -> impl FnOnce(VcsError) -> Self {
        let what = what.into();
        move |source| StoreError::ObjectWrite { what, source }
    }

    pub(crate) fn read(what: impl Into<String>) -> impl FnOnce(VcsError) -> Self {
        let what = what.into();
        move |source| StoreError::ObjectRead { what, source }
    }

    /// Whether the error means the checkpoint branch has not been created
    pub fn is_branch_missing(&self) -> bool {
        matches!(self, StoreError::BranchMissing(_))
    }
}
