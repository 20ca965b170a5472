//! Checkpoint subtree builder
//!
//! Writes the metadata blob and the six session blobs, then assembles
//!
//! ```text
//! <rest>/
//!   metadata.json
//!   0/
//!     content_hash.txt  context.md  diff.patch
//!     full.jsonl        metadata.json  prompt.txt
//! ```
//!
//! and returns the id of the `<rest>` tree, ready to be merged into a shard.

use crate::checkpoint::{to_json, Checkpoint, SessionFile, SessionFiles};
use crate::error::StoreError;
use crate::Result;
use partio_core::{ObjectId, TreeEntry, VersionControl};
use tracing::debug;

/// Name of the checkpoint-level metadata file
pub const METADATA_FILE: &str = "metadata.json";

/// Directory holding the first (and currently only) session of a checkpoint
pub const SESSION_DIR: &str = "0";

/// Write all blobs for a checkpoint and return its subtree id
pub fn build_checkpoint_tree<V: VersionControl>(
    vcs: &V,
    checkpoint: &Checkpoint,
    files: &SessionFiles,
) -> Result<ObjectId> {
    let id = &checkpoint.id;

    let metadata = to_json(&checkpoint.to_metadata(), "checkpoint metadata")?;
    let metadata_blob = vcs
        .write_blob(&metadata)
        .map_err(StoreError::write(format!("metadata for {id}")))?;

    let mut session_entries = Vec::with_capacity(SessionFile::ALL.len());
    for file in SessionFile::ALL {
        let blob = vcs
            .write_blob(&files.render(file)?)
            .map_err(StoreError::write(format!("{file} for {id}")))?;
        session_entries.push(TreeEntry::blob(file.file_name(), blob));
    }

    let session_tree = vcs
        .write_tree(&session_entries)
        .map_err(StoreError::write(format!("session tree for {id}")))?;

    let checkpoint_tree = vcs
        .write_tree(&[
            TreeEntry::blob(METADATA_FILE, metadata_blob),
            TreeEntry::tree(SESSION_DIR, session_tree),
        ])
        .map_err(StoreError::write(format!("checkpoint tree for {id}")))?;

    debug!(
        id = %id,
        metadata = %metadata_blob.short(),
        session = %session_tree.short(),
        tree = %checkpoint_tree.short(),
        "built checkpoint subtree"
    );

    Ok(checkpoint_tree)
}
