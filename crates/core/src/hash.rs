//! SHA-1 object identifiers for the git object model

use crate::vcs::VcsError;
use sha1::{Digest, Sha1};
use std::str::FromStr;

/// A git object id (20-byte SHA-1)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Length of an id in bytes
    pub const LEN: usize = 20;

    /// Create an ObjectId from raw bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create an ObjectId from a byte slice (must be exactly 20 bytes)
    pub fn from_slice(bytes: &[u8]) -> Result<Self, VcsError> {
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|_| VcsError::InvalidObjectId(hex::encode(bytes)))?;
        Ok(Self(array))
    }

    /// Get the id as a byte slice
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 40-character hex string
    pub fn from_hex(text: &str) -> Result<Self, VcsError> {
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|_| VcsError::InvalidObjectId(text.to_string()))?;
        Ok(Self(bytes))
    }

    /// Abbreviated form used in human-readable output
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }

    /// Id of the empty tree (`4b825dc...`)
    pub fn empty_tree() -> Self {
        hash_object(ObjectKind::Tree, b"")
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Type of object in the object database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    /// Name used in object headers and `ls-tree` output
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hash an object body the way git does: `<kind> <len>\0<body>`
///
/// Identical content always yields the identical id, which is what lets
/// repeated diffs or transcripts share storage across checkpoints.
pub fn hash_object(kind: ObjectKind, body: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(body.len().to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(body);
    ObjectId(hasher.finalize().into())
}
