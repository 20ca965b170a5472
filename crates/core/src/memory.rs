//! In-memory object database
//!
//! `MemoryRepo` stores blobs, trees and commits in process memory using the
//! same encoding and SHA-1 ids git would produce, so an id computed here
//! matches the id `git hash-object` reports for the same content. Store
//! tests and benches run against it; faults can be injected per operation.

use crate::hash::{hash_object, ObjectId, ObjectKind};
use crate::tree::{canonicalize, decode_tree, encode_tree, EntryMode, TreeEntry};
use crate::vcs::{RefExpectation, VcsError, VersionControl};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const SIGNATURE: &str = "partio <partio@localhost>";

/// Operation that can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    WriteBlob,
    WriteTree,
    WriteCommit,
    UpdateRef,
}

/// Counters of calls made against a [`MemoryRepo`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoStats {
    pub object_reads: u64,
    pub object_writes: u64,
    pub ref_reads: u64,
    pub ref_updates: u64,
}

impl RepoStats {
    /// Total number of calls of any kind
    pub fn total(&self) -> u64 {
        self.object_reads + self.object_writes + self.ref_reads + self.ref_updates
    }
}

#[derive(Default)]
struct Counters {
    object_reads: AtomicU64,
    object_writes: AtomicU64,
    ref_reads: AtomicU64,
    ref_updates: AtomicU64,
}

struct Object {
    kind: ObjectKind,
    body: Vec<u8>,
}

/// Embedded object store with git-compatible hashing
pub struct MemoryRepo {
    root: PathBuf,
    objects: RwLock<HashMap<ObjectId, Object>>,
    refs: RwLock<BTreeMap<String, ObjectId>>,
    failures: Mutex<HashSet<FailPoint>>,
    counters: Counters,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::with_root("/memory")
    }

    /// Create a repository reporting `root` as its top-level directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            objects: RwLock::new(HashMap::new()),
            refs: RwLock::new(BTreeMap::new()),
            failures: Mutex::new(HashSet::new()),
            counters: Counters::default(),
        }
    }

    /// Make the next call of `point` fail with a backend error
    pub fn fail_next(&self, point: FailPoint) {
        self.failures.lock().insert(point);
    }

    /// Snapshot of the call counters
    pub fn stats(&self) -> RepoStats {
        RepoStats {
            object_reads: self.counters.object_reads.load(Ordering::Relaxed),
            object_writes: self.counters.object_writes.load(Ordering::Relaxed),
            ref_reads: self.counters.ref_reads.load(Ordering::Relaxed),
            ref_updates: self.counters.ref_updates.load(Ordering::Relaxed),
        }
    }

    /// Number of objects stored
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().contains_key(id)
    }

    /// All reference names, sorted
    pub fn ref_names(&self) -> Vec<String> {
        self.refs.read().keys().cloned().collect()
    }

    /// Parent ids recorded in a commit
    pub fn commit_parents(&self, commit: &ObjectId) -> Result<Vec<ObjectId>, VcsError> {
        let body = self.read_object(commit, ObjectKind::Commit)?;
        let text = commit_text(&body)?;
        text.lines()
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.strip_prefix("parent "))
            .map(ObjectId::from_hex)
            .collect()
    }

    /// Message of a commit, without the trailing newline
    pub fn commit_message(&self, commit: &ObjectId) -> Result<String, VcsError> {
        let body = self.read_object(commit, ObjectKind::Commit)?;
        let text = commit_text(&body)?;
        let message = text
            .split_once("\n\n")
            .map(|(_, message)| message)
            .unwrap_or_default();
        Ok(message.trim_end_matches('\n').to_string())
    }

    fn check_fault(&self, point: FailPoint) -> Result<(), VcsError> {
        if self.failures.lock().remove(&point) {
            return Err(VcsError::backend(format!("injected {point:?} failure")));
        }
        Ok(())
    }

    fn read_object(&self, id: &ObjectId, expected: ObjectKind) -> Result<Vec<u8>, VcsError> {
        self.counters.object_reads.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read();
        let object = objects.get(id).ok_or(VcsError::ObjectNotFound(*id))?;
        if object.kind != expected {
            return Err(VcsError::WrongKind { id: *id, expected });
        }
        Ok(object.body.clone())
    }

    fn require(&self, id: &ObjectId, expected: ObjectKind) -> Result<(), VcsError> {
        match self.objects.read().get(id) {
            None => Err(VcsError::ObjectNotFound(*id)),
            Some(object) if object.kind != expected => Err(VcsError::WrongKind { id: *id, expected }),
            Some(_) => Ok(()),
        }
    }

    fn insert(&self, kind: ObjectKind, body: Vec<u8>) -> ObjectId {
        self.counters.object_writes.fetch_add(1, Ordering::Relaxed);
        let id = hash_object(kind, &body);
        self.objects
            .write()
            .entry(id)
            .or_insert(Object { kind, body });
        id
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn commit_text(body: &[u8]) -> Result<&str, VcsError> {
    std::str::from_utf8(body).map_err(|_| VcsError::Corrupt("commit is not UTF-8".into()))
}

impl VersionControl for MemoryRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>, VcsError> {
        self.counters.ref_reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.refs.read().get(name).copied())
    }

    fn commit_tree(&self, commit: &ObjectId) -> Result<ObjectId, VcsError> {
        let body = self.read_object(commit, ObjectKind::Commit)?;
        let text = commit_text(&body)?;
        let hex = text
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("tree "))
            .ok_or_else(|| VcsError::Corrupt(format!("commit {commit} has no tree header")))?;
        ObjectId::from_hex(hex)
    }

    fn list_tree(&self, tree: &ObjectId) -> Result<Vec<TreeEntry>, VcsError> {
        let body = self.read_object(tree, ObjectKind::Tree)?;
        decode_tree(&body)
    }

    fn read_blob(&self, blob: &ObjectId) -> Result<Vec<u8>, VcsError> {
        self.read_object(blob, ObjectKind::Blob)
    }

    fn write_blob(&self, content: &[u8]) -> Result<ObjectId, VcsError> {
        self.check_fault(FailPoint::WriteBlob)?;
        Ok(self.insert(ObjectKind::Blob, content.to_vec()))
    }

    fn write_tree(&self, entries: &[TreeEntry]) -> Result<ObjectId, VcsError> {
        self.check_fault(FailPoint::WriteTree)?;
        let entries = canonicalize(entries)?;
        // Submodule commits live in another repository.
        for entry in entries.iter().filter(|e| e.mode != EntryMode::Gitlink) {
            self.require(&entry.id, entry.kind())?;
        }
        Ok(self.insert(ObjectKind::Tree, encode_tree(&entries)))
    }

    fn write_commit(
        &self,
        tree: &ObjectId,
        parents: &[ObjectId],
        message: &str,
    ) -> Result<ObjectId, VcsError> {
        self.check_fault(FailPoint::WriteCommit)?;
        self.require(tree, ObjectKind::Tree)?;
        for parent in parents {
            self.require(parent, ObjectKind::Commit)?;
        }

        let timestamp = chrono::Utc::now().timestamp();
        let mut body = format!("tree {tree}\n");
        for parent in parents {
            body.push_str(&format!("parent {parent}\n"));
        }
        body.push_str(&format!("author {SIGNATURE} {timestamp} +0000\n"));
        body.push_str(&format!("committer {SIGNATURE} {timestamp} +0000\n"));
        body.push('\n');
        body.push_str(message);
        if !message.ends_with('\n') {
            body.push('\n');
        }

        Ok(self.insert(ObjectKind::Commit, body.into_bytes()))
    }

    fn update_ref(
        &self,
        name: &str,
        target: &ObjectId,
        expected: RefExpectation,
        _log_message: &str,
    ) -> Result<(), VcsError> {
        self.counters.ref_updates.fetch_add(1, Ordering::Relaxed);
        self.check_fault(FailPoint::UpdateRef)?;
        self.require(target, ObjectKind::Commit)?;

        let mut refs = self.refs.write();
        let actual = refs.get(name).copied();
        let matches = match expected {
            RefExpectation::Any => true,
            RefExpectation::Absent => actual.is_none(),
            RefExpectation::Matches(id) => actual == Some(id),
        };
        if !matches {
            return Err(VcsError::RefConflict {
                name: name.to_string(),
                expected: match expected {
                    RefExpectation::Matches(id) => Some(id),
                    _ => None,
                },
                actual,
            });
        }

        refs.insert(name.to_string(), *target);
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<bool, VcsError> {
        self.counters.ref_updates.fetch_add(1, Ordering::Relaxed);
        Ok(self.refs.write().remove(name).is_some())
    }
}
