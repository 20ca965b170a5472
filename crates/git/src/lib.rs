//! Git integration for partio
//!
//! This crate provides:
//! - `GitRepo`, the libgit2 implementation of `VersionControl`
//! - Repository helpers (HEAD, diffs, trailers, push, branch checkout)
//! - Hook script installation

pub mod error;
pub mod hooks;
pub mod ops;
pub mod repo;

// Re-exports
pub use error::GitError;
pub use hooks::{hook_status, install_hooks, uninstall_hooks, HookState, HOOK_NAMES};
pub use ops::FileStat;
pub use repo::GitRepo;
