//! Checkpoint identifiers and shard addressing
//!
//! An id is 6 random bytes rendered as 12 lowercase hex characters. The
//! first two characters name the shard directory at the branch root, the
//! remaining ten name the checkpoint directory inside it.

use crate::error::StoreError;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;

/// Length of a checkpoint id in characters
pub const ID_LEN: usize = 12;

/// Length of the shard prefix in characters
pub const SHARD_LEN: usize = 2;

/// A validated checkpoint identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckpointId(String);

impl CheckpointId {
    /// Generate a fresh id from the OS-seeded CSPRNG
    ///
    /// Ids are not checked against existing entries; collisions are
    /// improbable (48 bits) but not impossible, and the store rejects a
    /// colliding write with `DuplicateIdentifier`.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_LEN / 2];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Parse and validate an id
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        if text.len() != ID_LEN {
            return Err(StoreError::MalformedIdentifier {
                id: text.to_string(),
                reason: format!("expected {ID_LEN} characters, got {}", text.len()),
            });
        }
        if !text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(StoreError::MalformedIdentifier {
                id: text.to_string(),
                reason: "expected lowercase hex characters".to_string(),
            });
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory name (first two characters)
    pub fn shard(&self) -> &str {
        &self.0[..SHARD_LEN]
    }

    /// Checkpoint directory name inside the shard (last ten characters)
    pub fn rest(&self) -> &str {
        &self.0[SHARD_LEN..]
    }

    /// Path of the checkpoint directory relative to the branch root
    pub fn tree_path(&self) -> String {
        format!("{}/{}", self.shard(), self.rest())
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CheckpointId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CheckpointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Shard prefix of an arbitrary string
///
/// Returns the whole input when it is shorter than two characters.
pub fn shard(id: &str) -> &str {
    match id.get(..SHARD_LEN) {
        Some(prefix) => prefix,
        None => id,
    }
}

/// Everything after the shard prefix; empty for inputs of two characters or fewer
pub fn rest(id: &str) -> &str {
    id.get(SHARD_LEN..).unwrap_or("")
}
