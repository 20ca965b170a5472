//! Read path
//!
//! All reads go straight to the objects under the branch tip; no working
//! copy is checked out.

use crate::builder::{METADATA_FILE, SESSION_DIR};
use crate::checkpoint::{CheckpointData, Metadata, SessionFile, SessionFiles, SessionMetadata};
use crate::error::StoreError;
use crate::id::CheckpointId;
use crate::store::CheckpointStore;
use crate::Result;
use partio_core::{ObjectId, TreeEntry, VcsError, VersionControl};

/// One entry of a checkpoint listing
#[derive(Debug)]
pub struct ListedCheckpoint {
    /// Shard and rest joined back together
    pub id: String,
    /// Parsed metadata, or why it could not be read
    pub metadata: std::result::Result<Metadata, StoreError>,
}

impl ListedCheckpoint {
    pub fn is_available(&self) -> bool {
        self.metadata.is_ok()
    }
}

impl<V: VersionControl> CheckpointStore<V> {
    /// Read and parse `<shard>/<rest>/metadata.json`
    pub fn read_metadata(&self, id: &str) -> Result<Metadata> {
        let id = CheckpointId::parse(id)?;
        let root = self.root_tree()?;
        self.metadata_at(&root, id.shard(), id.rest())
    }

    /// Read one file from the checkpoint's session directory
    pub fn read_session_file(&self, id: &str, file: SessionFile) -> Result<String> {
        let id = CheckpointId::parse(id)?;
        let root = self.root_tree()?;
        self.session_file_at(&root, &id, file)
    }

    /// Read metadata and all six session files
    ///
    /// Unlike [`list`](Self::list), a missing or malformed metadata file is
    /// an error here.
    pub fn read_checkpoint(&self, id: &str) -> Result<CheckpointData> {
        let id = CheckpointId::parse(id)?;
        let root = self.root_tree()?;
        let metadata = self.metadata_at(&root, id.shard(), id.rest())?;

        let text = |file| self.session_file_at(&root, &id, file);
        let session_meta = text(SessionFile::Metadata)?;
        let session_meta: SessionMetadata =
            serde_json::from_str(&session_meta).map_err(|e| StoreError::MetadataUnavailable {
                id: id.to_string(),
                reason: format!("session metadata: {e}"),
            })?;

        Ok(CheckpointData {
            metadata,
            session: SessionFiles {
                content_hash: text(SessionFile::ContentHash)?,
                context: text(SessionFile::Context)?,
                diff: text(SessionFile::Diff)?,
                full_jsonl: text(SessionFile::FullJsonl)?,
                metadata: session_meta,
                prompt: text(SessionFile::Prompt)?,
            },
        })
    }

    /// Shard directory names at the branch root
    pub fn list_shards(&self) -> Result<Vec<String>> {
        let root = self.root_tree()?;
        Ok(self
            .shards_at(&root)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Checkpoint directory names inside `shard`; empty when the shard is absent
    pub fn list_entries(&self, shard: &str) -> Result<Vec<String>> {
        let root = self.root_tree()?;
        match self.shards_at(&root)?.into_iter().find(|entry| entry.name == shard) {
            Some(shard_entry) => self.entries_in(&shard_entry),
            None => Ok(Vec::new()),
        }
    }

    /// Every checkpoint on the branch, in tree order
    ///
    /// Entries whose metadata is missing or malformed are reported with the
    /// reason instead of failing the whole listing. The tip is resolved once,
    /// so a concurrent write never mixes two snapshots.
    pub fn list(&self) -> Result<Vec<ListedCheckpoint>> {
        let root = self.root_tree()?;
        let mut listed = Vec::new();
        for shard_entry in self.shards_at(&root)? {
            for rest in self.entries_in(&shard_entry)? {
                let metadata = self.metadata_at(&root, &shard_entry.name, &rest);
                listed.push(ListedCheckpoint {
                    id: format!("{}{rest}", shard_entry.name),
                    metadata,
                });
            }
        }
        Ok(listed)
    }

    /// Number of checkpoint directories on the branch
    pub fn count(&self) -> Result<usize> {
        let root = self.root_tree()?;
        let mut total = 0;
        for shard_entry in self.shards_at(&root)? {
            total += self.entries_in(&shard_entry)?.len();
        }
        Ok(total)
    }

    fn shards_at(&self, root: &ObjectId) -> Result<Vec<TreeEntry>> {
        let entries = self
            .vcs
            .list_tree(root)
            .map_err(StoreError::read("checkpoint root tree"))?;
        Ok(entries.into_iter().filter(|entry| entry.is_tree()).collect())
    }

    fn entries_in(&self, shard_entry: &TreeEntry) -> Result<Vec<String>> {
        let entries = self
            .vcs
            .list_tree(&shard_entry.id)
            .map_err(StoreError::read(format!("shard {}", shard_entry.name)))?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_tree())
            .map(|entry| entry.name)
            .collect())
    }

    fn metadata_at(&self, root: &ObjectId, shard: &str, rest: &str) -> Result<Metadata> {
        let id = format!("{shard}{rest}");
        let unavailable = |reason: String| StoreError::MetadataUnavailable {
            id: id.clone(),
            reason,
        };

        let path = format!("{shard}/{rest}/{METADATA_FILE}");
        let bytes = match self.vcs.read_blob_at(root, &path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(unavailable(format!("{path} not found"))),
            Err(err @ (VcsError::WrongKind { .. } | VcsError::Corrupt(_))) => {
                return Err(unavailable(err.to_string()))
            }
            Err(source) => return Err(StoreError::read(path)(source)),
        };

        serde_json::from_slice(&bytes).map_err(|e| unavailable(format!("invalid metadata: {e}")))
    }

    fn session_file_at(&self, root: &ObjectId, id: &CheckpointId, file: SessionFile) -> Result<String> {
        let path = format!("{}/{SESSION_DIR}/{}", id.tree_path(), file.file_name());
        let bytes = self
            .vcs
            .read_blob_at(root, &path)
            .map_err(StoreError::read(path.clone()))?
            .ok_or_else(|| StoreError::SessionFileMissing {
                id: id.to_string(),
                file: file.file_name(),
            })?;

        String::from_utf8(bytes).map_err(|_| StoreError::ObjectRead {
            what: path,
            source: VcsError::Corrupt("session file is not UTF-8".to_string()),
        })
    }
}
