//! Tree entries and the canonical tree encoding

use crate::hash::{ObjectId, ObjectKind};
use crate::vcs::VcsError;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Mode of a tree entry
///
/// Covers every mode git writes; a decoded entry re-encodes byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryMode {
    /// Regular file (`100644`)
    Blob,
    /// Executable file (`100755`)
    Executable,
    /// Symbolic link (`120000`)
    Symlink,
    /// Subdirectory (`040000`)
    Tree,
    /// Submodule commit (`160000`)
    Gitlink,
}

impl EntryMode {
    /// Mode as printed by `ls-tree` and accepted by `mktree`
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::Blob => "100644",
            EntryMode::Executable => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Tree => "040000",
            EntryMode::Gitlink => "160000",
        }
    }

    /// Numeric file mode
    pub fn as_octal(&self) -> u32 {
        match self {
            EntryMode::Blob => 0o100644,
            EntryMode::Executable => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Tree => 0o040000,
            EntryMode::Gitlink => 0o160000,
        }
    }

    /// Map a numeric file mode
    pub fn from_octal(mode: u32) -> Option<Self> {
        match mode {
            0o100644 | 0o100664 => Some(EntryMode::Blob),
            0o100755 => Some(EntryMode::Executable),
            0o120000 => Some(EntryMode::Symlink),
            0o040000 => Some(EntryMode::Tree),
            0o160000 => Some(EntryMode::Gitlink),
            _ => None,
        }
    }

    /// Kind of object the entry points at
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            EntryMode::Blob | EntryMode::Executable | EntryMode::Symlink => ObjectKind::Blob,
            EntryMode::Tree => ObjectKind::Tree,
            EntryMode::Gitlink => ObjectKind::Commit,
        }
    }

    // Raw tree objects drop the leading zero on directory modes.
    fn raw(&self) -> &'static [u8] {
        match self {
            EntryMode::Tree => b"40000",
            other => other.as_str().as_bytes(),
        }
    }

    fn from_raw(raw: &[u8]) -> Option<Self> {
        match raw {
            b"100644" => Some(EntryMode::Blob),
            // Legacy group-writable mode; git reads it as a regular file.
            b"100664" => Some(EntryMode::Blob),
            b"100755" => Some(EntryMode::Executable),
            b"120000" => Some(EntryMode::Symlink),
            b"40000" | b"040000" => Some(EntryMode::Tree),
            b"160000" => Some(EntryMode::Gitlink),
            _ => None,
        }
    }
}

/// A (mode, type, hash, name) tuple inside a tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub id: ObjectId,
    pub name: String,
}

impl TreeEntry {
    /// Create a file entry
    pub fn blob(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode: EntryMode::Blob,
            id,
            name: name.into(),
        }
    }

    /// Create a subdirectory entry
    pub fn tree(name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode: EntryMode::Tree,
            id,
            name: name.into(),
        }
    }

    pub fn is_tree(&self) -> bool {
        self.mode == EntryMode::Tree
    }

    pub fn kind(&self) -> ObjectKind {
        self.mode.object_kind()
    }
}

impl std::fmt::Display for TreeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}\t{}",
            self.mode.as_str(),
            self.kind(),
            self.id,
            self.name
        )
    }
}

/// Compare two entries in git's tree order
///
/// Names compare bytewise, except that a subtree sorts as if its name had a
/// trailing `/`.
pub fn canonical_cmp(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    fn key(entry: &TreeEntry) -> impl Iterator<Item = u8> + '_ {
        let suffix: &[u8] = if entry.is_tree() { b"/" } else { b"" };
        entry.name.bytes().chain(suffix.iter().copied())
    }
    key(a).cmp(key(b))
}

/// Validate a single path component used as an entry name
pub fn validate_name(name: &str) -> Result<(), VcsError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\0')
    {
        return Err(VcsError::InvalidEntryName(name.to_string()));
    }
    Ok(())
}

/// Produce the canonical entry list for a tree object
///
/// Validates names, rejects duplicates and sorts into git order.
pub fn canonicalize(entries: &[TreeEntry]) -> Result<Vec<TreeEntry>, VcsError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        validate_name(&entry.name)?;
        if !seen.insert(entry.name.as_str()) {
            return Err(VcsError::DuplicateEntry(entry.name.clone()));
        }
    }

    let mut sorted = entries.to_vec();
    sorted.sort_by(canonical_cmp);
    Ok(sorted)
}

/// Serialize canonical entries into a raw tree body
///
/// Format per entry: `<mode> <name>\0<20-byte id>`
pub fn encode_tree(entries: &[TreeEntry]) -> Vec<u8> {
    let mut body = Vec::with_capacity(entries.len() * 40);
    for entry in entries {
        body.extend_from_slice(entry.mode.raw());
        body.push(b' ');
        body.extend_from_slice(entry.name.as_bytes());
        body.push(0);
        body.extend_from_slice(entry.id.as_bytes());
    }
    body
}

/// Parse a raw tree body
pub fn decode_tree(body: &[u8]) -> Result<Vec<TreeEntry>, VcsError> {
    let mut entries = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| VcsError::Corrupt("tree entry missing mode".into()))?;
        let mode = EntryMode::from_raw(&rest[..space]).ok_or_else(|| {
            VcsError::Corrupt(format!(
                "unsupported tree entry mode {}",
                String::from_utf8_lossy(&rest[..space])
            ))
        })?;
        rest = &rest[space + 1..];

        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| VcsError::Corrupt("tree entry missing name terminator".into()))?;
        let name = std::str::from_utf8(&rest[..nul])
            .map_err(|_| VcsError::Corrupt("tree entry name is not UTF-8".into()))?
            .to_string();
        rest = &rest[nul + 1..];

        if rest.len() < ObjectId::LEN {
            return Err(VcsError::Corrupt("tree entry truncated".into()));
        }
        let id = ObjectId::from_slice(&rest[..ObjectId::LEN])?;
        rest = &rest[ObjectId::LEN..];

        entries.push(TreeEntry { mode, id, name });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_object;

    fn blob_id(content: &str) -> ObjectId {
        hash_object(ObjectKind::Blob, content.as_bytes())
    }

    #[test]
    fn test_canonical_order_sorts_by_name() {
        let entries = vec![
            TreeEntry::blob("prompt.txt", blob_id("p")),
            TreeEntry::blob("content_hash.txt", blob_id("c")),
            TreeEntry::blob("metadata.json", blob_id("m")),
        ];
        let sorted = canonicalize(&entries).unwrap();
        let names: Vec<_> = sorted.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["content_hash.txt", "metadata.json", "prompt.txt"]);
    }

    #[test]
    fn test_subtrees_sort_with_trailing_slash() {
        // "a.txt" < "a/" because '.' (0x2e) < '/' (0x2f), but "a" (blob) < "a.txt"
        let dir = TreeEntry::tree("a", ObjectId::empty_tree());
        let file = TreeEntry::blob("a.txt", blob_id("x"));
        assert_eq!(canonical_cmp(&file, &dir), Ordering::Less);

        let plain = TreeEntry::blob("a", blob_id("y"));
        assert_eq!(canonical_cmp(&plain, &file), Ordering::Less);
    }

    #[test]
    fn test_session_dir_sorts_before_metadata() {
        let entries = vec![
            TreeEntry::tree("0", ObjectId::empty_tree()),
            TreeEntry::blob("metadata.json", blob_id("m")),
        ];
        let sorted = canonicalize(&entries).unwrap();
        assert_eq!(sorted[0].name, "0");
        assert_eq!(sorted[1].name, "metadata.json");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let entries = vec![
            TreeEntry::tree("cdef123456", ObjectId::empty_tree()),
            TreeEntry::tree("cdef123456", ObjectId::empty_tree()),
        ];
        assert!(matches!(
            canonicalize(&entries),
            Err(VcsError::DuplicateEntry(name)) if name == "cdef123456"
        ));
    }

    #[test]
    fn test_invalid_names_rejected() {
        for bad in ["", ".", "..", "a/b", "nul\0byte"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
        assert!(validate_name("metadata.json").is_ok());
    }

    #[test]
    fn test_encode_decode_tree() {
        let entries = canonicalize(&[
            TreeEntry::blob("metadata.json", blob_id("{}")),
            TreeEntry::tree("0", ObjectId::empty_tree()),
        ])
        .unwrap();

        let body = encode_tree(&entries);
        assert!(body.starts_with(b"40000 0\0"));
        assert_eq!(decode_tree(&body).unwrap(), entries);
    }

    #[test]
    fn test_decode_truncated_tree_fails() {
        let body = encode_tree(&[TreeEntry::blob("a", blob_id("a"))]);
        assert!(decode_tree(&body[..body.len() - 3]).is_err());
    }

    #[test]
    fn test_foreign_modes_survive_encoding() {
        let entries = canonicalize(&[
            TreeEntry {
                mode: EntryMode::Executable,
                id: blob_id("#!/bin/sh\n"),
                name: "tool.sh".to_string(),
            },
            TreeEntry {
                mode: EntryMode::Symlink,
                id: blob_id("tool.sh"),
                name: "link".to_string(),
            },
            TreeEntry {
                mode: EntryMode::Gitlink,
                id: blob_id("not really a commit"),
                name: "vendor".to_string(),
            },
        ])
        .unwrap();

        let body = encode_tree(&entries);
        assert!(body.starts_with(b"120000 link\0"));
        let decoded = decode_tree(&body).unwrap();
        assert_eq!(decoded, entries);
        assert_eq!(decoded[2].kind(), ObjectKind::Commit);
    }

    #[test]
    fn test_modes_map_both_ways() {
        for mode in [
            EntryMode::Blob,
            EntryMode::Executable,
            EntryMode::Symlink,
            EntryMode::Tree,
            EntryMode::Gitlink,
        ] {
            assert_eq!(EntryMode::from_octal(mode.as_octal()), Some(mode));
        }
        assert_eq!(EntryMode::from_octal(0o100600), None);
    }

    #[test]
    fn test_display_matches_ls_tree() {
        let entry = TreeEntry::tree("a1", ObjectId::empty_tree());
        assert_eq!(
            entry.to_string(),
            "040000 tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\ta1"
        );
    }
}
