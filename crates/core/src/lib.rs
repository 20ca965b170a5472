//! Partio Core - git object model primitives for the checkpoint store
//!
//! This crate provides:
//! - SHA-1 object ids with git-compatible hashing
//! - Tree entries and canonical tree encoding
//! - The `VersionControl` plumbing interface
//! - `MemoryRepo`, an embedded in-memory object store

pub mod hash;
pub mod memory;
pub mod tree;
pub mod vcs;

// Re-export main types for convenience
pub use hash::{hash_object, ObjectId, ObjectKind};
pub use memory::{FailPoint, MemoryRepo, RepoStats};
pub use tree::{EntryMode, TreeEntry};
pub use vcs::{RefExpectation, VcsError, VersionControl};
