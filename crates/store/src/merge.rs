//! Tree merge engine
//!
//! Inserts one checkpoint subtree into the two-level `shard/rest` layout of
//! the branch root. Only the touched shard tree and the root tree are
//! rebuilt; every sibling entry keeps its existing object id.

use crate::error::StoreError;
use crate::Result;
use partio_core::{ObjectId, ObjectKind, TreeEntry, VcsError, VersionControl};
use tracing::{debug, warn};

/// Where a new checkpoint subtree goes
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub shard: &'a str,
    pub rest: &'a str,
    pub subtree: ObjectId,
}

/// Merge `placement` into `root` and return the new root tree id
///
/// A root tree that cannot be found is treated as empty; any other read
/// failure aborts the write. Fails with
/// `DuplicateIdentifier` when the shard already holds an entry named
/// `rest`.
pub fn merge_into_root<V: VersionControl>(
    vcs: &V,
    root: &ObjectId,
    placement: Placement<'_>,
) -> Result<ObjectId> {
    let Placement {
        shard,
        rest,
        subtree,
    } = placement;

    let mut root_entries = match vcs.list_tree(root) {
        Ok(entries) => entries,
        Err(err @ VcsError::ObjectNotFound(_)) => {
            warn!(root = %root, error = %err, "checkpoint root tree missing, starting empty");
            Vec::new()
        }
        Err(source) => return Err(StoreError::read("checkpoint root tree")(source)),
    };

    let existing_shard = root_entries.iter().position(|entry| entry.name == shard);

    let mut shard_entries = match existing_shard {
        Some(index) => {
            let entry = &root_entries[index];
            if !entry.is_tree() {
                return Err(StoreError::ObjectRead {
                    what: format!("shard {shard}"),
                    source: VcsError::WrongKind {
                        id: entry.id,
                        expected: ObjectKind::Tree,
                    },
                });
            }
            vcs.list_tree(&entry.id)
                .map_err(StoreError::read(format!("shard {shard}")))?
        }
        None => Vec::new(),
    };

    if shard_entries.iter().any(|entry| entry.name == rest) {
        return Err(StoreError::DuplicateIdentifier(format!("{shard}{rest}")));
    }
    shard_entries.push(TreeEntry::tree(rest, subtree));

    let shard_tree = vcs
        .write_tree(&shard_entries)
        .map_err(StoreError::write(format!("shard tree {shard}")))?;

    let new_shard = TreeEntry::tree(shard, shard_tree);
    match existing_shard {
        Some(index) => root_entries[index] = new_shard,
        None => root_entries.push(new_shard),
    }

    let new_root = vcs
        .write_tree(&root_entries)
        .map_err(StoreError::write("checkpoint root tree"))?;

    debug!(
        shard,
        rest,
        shard_tree = %shard_tree.short(),
        root = %new_root.short(),
        entries_in_shard = shard_entries.len(),
        "merged checkpoint into root"
    );

    Ok(new_root)
}
