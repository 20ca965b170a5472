//! Checkpoint store on an orphan git branch
//!
//! This crate provides:
//! - Checkpoint identifiers and two-level shard addressing
//! - Checkpoint and session-file records with their JSON layout
//! - The subtree builder and tree merge engine
//! - The commit appender (unconditional or compare-and-swap ref update)
//! - The read path used by listing and restore commands

pub mod append;
pub mod builder;
pub mod checkpoint;
pub mod error;
pub mod id;
pub mod merge;
pub mod read;
pub mod store;

// Re-exports
pub use append::{PreparedWrite, RefUpdatePolicy, WriteReceipt};
pub use checkpoint::{
    Checkpoint, CheckpointData, Metadata, SessionFile, SessionFiles, SessionMetadata,
};
pub use error::StoreError;
pub use id::{rest, shard, CheckpointId};
pub use read::ListedCheckpoint;
pub use store::{CheckpointStore, CHECKPOINT_BRANCH, INIT_MESSAGE};

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
