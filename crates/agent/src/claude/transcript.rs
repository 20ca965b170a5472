//! Claude Code JSONL transcript parsing

use crate::error::{AgentError, Result};
use crate::session::{Message, SessionData};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONTEXT_LIMIT: usize = 200;
const FALLBACK_CONTEXT: &str = "AI coding session";

/// Parse a transcript file
pub fn parse_jsonl(path: &Path) -> Result<SessionData> {
    let bytes = fs::read(path).map_err(AgentError::io(path))?;
    Ok(parse_transcript(&String::from_utf8_lossy(&bytes)))
}

/// Parse transcript text, one JSON object per line
///
/// Blank and malformed lines are skipped.
pub fn parse_transcript(text: &str) -> SessionData {
    let mut data = SessionData {
        agent: super::AGENT_NAME.to_string(),
        ..Default::default()
    };
    let mut first_ts: Option<DateTime<Utc>> = None;
    let mut last_ts: Option<DateTime<Utc>> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(entry) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if !entry.is_object() {
            continue;
        }

        if data.session_id.is_empty() {
            if let Some(id) = entry.get("sessionId").and_then(Value::as_str) {
                data.session_id = id.to_string();
            }
        }
        if data.plan_slug.is_none() {
            if let Some(slug) = entry.get("slug").and_then(Value::as_str) {
                if !slug.is_empty() {
                    data.plan_slug = Some(slug.to_string());
                }
            }
        }

        let timestamp = entry.get("timestamp").and_then(parse_timestamp);
        if let Some(ts) = timestamp {
            first_ts.get_or_insert(ts);
            last_ts = Some(ts);
        }

        data.total_tokens += usage_tokens(&entry);

        let role = entry
            .get("role")
            .and_then(Value::as_str)
            .or_else(|| entry.get("type").and_then(Value::as_str))
            .unwrap_or_default();
        let content = entry_text(&entry);
        if content.is_empty() {
            continue;
        }
        data.transcript.push(Message {
            role: role.to_string(),
            content,
            timestamp,
        });
    }

    if let Some(first) = data.transcript.iter().find(|m| is_human(&m.role)) {
        data.prompt = first.content.clone();
    }
    data.context = context_for(&data);
    if let (Some(first), Some(last)) = (first_ts, last_ts) {
        data.duration = (last - first).to_std().unwrap_or(Duration::ZERO);
    }
    data
}

fn is_human(role: &str) -> bool {
    matches!(role, "human" | "user")
}

fn context_for(data: &SessionData) -> String {
    if data.transcript.is_empty() {
        return String::new();
    }
    if data.prompt.is_empty() {
        return FALLBACK_CONTEXT.to_string();
    }
    match data.prompt.char_indices().nth(CONTEXT_LIMIT) {
        Some((cut, _)) => format!("{}...", &data.prompt[..cut]),
        None => data.prompt.clone(),
    }
}

/// Epoch seconds (integer or fractional) or an RFC-3339 string
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            if !secs.is_finite() || secs <= 0.0 {
                return None;
            }
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
            Utc.timestamp_opt(whole, nanos.min(999_999_999)).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        _ => None,
    }
}

fn usage_tokens(entry: &Value) -> u64 {
    let Some(usage) = entry.get("message").and_then(|m| m.get("usage")) else {
        return 0;
    };
    let field = |name: &str| usage.get(name).and_then(Value::as_u64).unwrap_or(0);
    field("input_tokens") + field("output_tokens")
}

/// First non-empty text among the places Claude Code puts it
fn entry_text(entry: &Value) -> String {
    let message = entry.get("message");
    let candidates = [
        entry.get("contentBlocks").map(block_text),
        message.and_then(|m| m.get("content")).map(value_text),
        message.and_then(Value::as_str).map(str::to_string),
        entry.get("content").map(value_text),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) => block_text(value),
        _ => String::new(),
    }
}

/// Text blocks joined by newlines; tool calls and results are ignored
fn block_text(value: &Value) -> String {
    let Some(blocks) = value.as_array() else {
        return String::new();
    };
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"{"type":"user","sessionId":"sess-1","slug":"tidy-plan","timestamp":"2025-02-03T10:00:00Z","message":{"role":"user","content":"Add pagination to the listing endpoint"}}
not json at all

{"type":"assistant","sessionId":"sess-2","timestamp":"2025-02-03T10:01:30Z","message":{"role":"assistant","content":[{"type":"text","text":"Sure."},{"type":"tool_use","name":"Edit"}],"usage":{"input_tokens":100,"output_tokens":25}}}
{"type":"user","timestamp":"2025-02-03T10:02:00Z","message":{"role":"user","content":[{"type":"tool_result","content":"ok"}]}}
"#;

    #[test]
    fn test_parse_claude_session() {
        let data = parse_transcript(SESSION);
        assert_eq!(data.session_id, "sess-1");
        assert_eq!(data.agent, "claude-code");
        assert_eq!(data.plan_slug.as_deref(), Some("tidy-plan"));
        assert_eq!(data.prompt, "Add pagination to the listing endpoint");
        assert_eq!(data.context, data.prompt);
        assert_eq!(data.total_tokens, 125);
        assert_eq!(data.duration, Duration::from_secs(120));

        // The tool-result turn carries no text.
        assert_eq!(data.transcript.len(), 2);
        assert_eq!(data.transcript[1].role, "assistant");
        assert_eq!(data.transcript[1].content, "Sure.");
    }

    #[test]
    fn test_legacy_shapes_and_epoch_timestamps() {
        let text = r#"{"role":"human","timestamp":1700000000.5,"contentBlocks":[{"type":"text","text":"fix the bug"}]}
{"role":"assistant","timestamp":1700000010,"content":"done"}
{"type":"human","timestamp":1700000020,"message":"thanks"}
{"role":"assistant","content":[{"type":"text","text":"a"},{"type":"text","text":"b"}]}"#;
        let data = parse_transcript(text);

        let texts: Vec<_> = data.transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, ["fix the bug", "done", "thanks", "a\nb"]);
        assert_eq!(data.prompt, "fix the bug");
        assert_eq!(data.duration, Duration::from_millis(19_500));
        assert_eq!(data.session_id, "");
    }

    #[test]
    fn test_context_truncated_on_char_boundary() {
        let prompt = "é".repeat(250);
        let line = serde_json::json!({"role": "user", "content": prompt}).to_string();
        let data = parse_transcript(&line);

        assert_eq!(data.prompt.chars().count(), 250);
        assert!(data.context.ends_with("..."));
        assert_eq!(data.context.chars().count(), 203);
    }

    #[test]
    fn test_context_fallbacks() {
        assert_eq!(parse_transcript("").context, "");
        assert_eq!(parse_transcript("\n\n{broken").context, "");

        let data = parse_transcript(r#"{"role":"assistant","content":"hello"}"#);
        assert_eq!(data.prompt, "");
        assert_eq!(data.context, "AI coding session");
        assert_eq!(data.duration, Duration::ZERO);
    }
}
