//! Checkpoint records and session bundles

use crate::error::StoreError;
use crate::id::CheckpointId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One captured event pairing a commit with AI-session provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub session_id: String,
    /// Source commit this checkpoint annotates
    pub commit_hash: String,
    /// Branch name at capture time
    pub branch: String,
    pub created_at: DateTime<Utc>,
    /// Name of the AI tool
    pub agent: String,
    /// Share of the change attributed to the agent (0-100)
    pub agent_percent: u8,
    pub content_hash: String,
    pub plan_slug: Option<String>,
}

impl Checkpoint {
    /// Check the fields the store relies on
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.agent_percent > 100 {
            return Err(StoreError::InvalidCheckpoint(format!(
                "agent_percent must be between 0 and 100, got {}",
                self.agent_percent
            )));
        }
        if self.commit_hash.trim().is_empty() {
            return Err(StoreError::InvalidCheckpoint(
                "commit_hash must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Storage form written to `metadata.json`
    pub fn to_metadata(&self) -> Metadata {
        Metadata {
            id: self.id.to_string(),
            session_id: self.session_id.clone(),
            commit_hash: self.commit_hash.clone(),
            branch: self.branch.clone(),
            created_at: self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            agent: self.agent.clone(),
            agent_percent: self.agent_percent,
            content_hash: self.content_hash.clone(),
            plan_slug: self.plan_slug.clone(),
        }
    }
}

/// JSON schema of `<shard>/<rest>/metadata.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: String,
    #[serde(default)]
    pub session_id: String,
    pub commit_hash: String,
    #[serde(default)]
    pub branch: String,
    /// RFC-3339 timestamp at second precision
    pub created_at: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub agent_percent: u8,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_slug: Option<String>,
}

impl Metadata {
    /// Parse `created_at` back into a timestamp
    pub fn created_at(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(&self.created_at).map(|ts| ts.with_timezone(&Utc))
    }

    /// Rebuild the checkpoint record this metadata was written from
    pub fn to_checkpoint(&self) -> Result<Checkpoint, StoreError> {
        let unavailable = |reason: String| StoreError::MetadataUnavailable {
            id: self.id.clone(),
            reason,
        };
        let checkpoint = Checkpoint {
            id: CheckpointId::parse(&self.id)?,
            session_id: self.session_id.clone(),
            commit_hash: self.commit_hash.clone(),
            branch: self.branch.clone(),
            created_at: self
                .created_at()
                .map_err(|e| unavailable(format!("bad created_at: {e}")))?,
            agent: self.agent.clone(),
            agent_percent: self.agent_percent,
            content_hash: self.content_hash.clone(),
            plan_slug: self.plan_slug.clone(),
        };
        Ok(checkpoint)
    }
}

/// JSON schema of `<shard>/<rest>/0/metadata.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub agent: String,
    pub total_tokens: u64,
    pub duration: String,
}

/// One of the six files in a checkpoint's session directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionFile {
    ContentHash,
    Context,
    Diff,
    FullJsonl,
    Metadata,
    Prompt,
}

impl SessionFile {
    /// All session files, in tree order
    pub const ALL: [SessionFile; 6] = [
        SessionFile::ContentHash,
        SessionFile::Context,
        SessionFile::Diff,
        SessionFile::FullJsonl,
        SessionFile::Metadata,
        SessionFile::Prompt,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            SessionFile::ContentHash => "content_hash.txt",
            SessionFile::Context => "context.md",
            SessionFile::Diff => "diff.patch",
            SessionFile::FullJsonl => "full.jsonl",
            SessionFile::Metadata => "metadata.json",
            SessionFile::Prompt => "prompt.txt",
        }
    }
}

impl fmt::Display for SessionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl FromStr for SessionFile {
    type Err = String;

    /// Accepts the file name with or without its extension
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SessionFile::ALL
            .into_iter()
            .find(|file| {
                let name = file.file_name();
                s == name || name.split('.').next() == Some(s)
            })
            .ok_or_else(|| {
                let names: Vec<_> = SessionFile::ALL.iter().map(|f| f.file_name()).collect();
                format!("unknown session file `{s}` (expected one of {})", names.join(", "))
            })
    }
}

/// The six text artifacts stored alongside a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFiles {
    pub content_hash: String,
    pub context: String,
    pub diff: String,
    pub full_jsonl: String,
    pub metadata: SessionMetadata,
    pub prompt: String,
}

impl SessionFiles {
    /// Bytes stored for `file`
    pub fn render(&self, file: SessionFile) -> Result<Vec<u8>, StoreError> {
        let text = match file {
            SessionFile::ContentHash => &self.content_hash,
            SessionFile::Context => &self.context,
            SessionFile::Diff => &self.diff,
            SessionFile::FullJsonl => &self.full_jsonl,
            SessionFile::Prompt => &self.prompt,
            SessionFile::Metadata => return to_json(&self.metadata, "session metadata"),
        };
        Ok(text.as_bytes().to_vec())
    }
}

/// Everything stored for one checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointData {
    pub metadata: Metadata,
    pub session: SessionFiles,
}

/// Serialize as two-space indented JSON
pub(crate) fn to_json<T: Serialize>(value: &T, what: &'static str) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode { what, source })
}
