//! Coding-agent session support for partio
//!
//! Features:
//! - Agent detection behind the [`Detector`] trait
//! - Claude Code session discovery and JSONL transcript parsing
//! - Plan document lookup
//! - Line attribution for a commit
//! - The pre-commit to post-commit state hand-off

pub mod attribution;
pub mod claude;
pub mod detector;
pub mod error;
pub mod session;
pub mod state;

pub use attribution::{calculate, Attribution};
pub use claude::{parse_jsonl, ClaudeDetector, AGENT_NAME};
pub use detector::Detector;
pub use error::{AgentError, Result};
pub use session::{format_duration, Message, SessionData};
pub use state::PreCommitState;
